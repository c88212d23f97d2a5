use std::sync::{Arc, LazyLock};

use alloy_primitives::{B256, aliases::B32, fixed_bytes};
use ream_consensus_misc::misc::compute_fork_digest;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Sepolia,
    Hoodi,
    Dev,
    Custom(String),
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            "hoodi" => Ok(Network::Hoodi),
            "dev" => Ok(Network::Dev),
            custom => Ok(Network::Custom(custom.to_string())),
        }
    }
}

/// The subset of a beacon chain config the gossip layer depends on. Unknown keys of a full
/// `config.yaml` are ignored.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct BeaconNetworkSpec {
    pub preset_base: String,
    #[serde(rename = "CONFIG_NAME")]
    pub network: Network,

    // Forking
    #[serde(with = "crate::b32_hex")]
    pub genesis_fork_version: B32,
    #[serde(with = "crate::b32_hex")]
    pub altair_fork_version: B32,
    pub altair_fork_epoch: u64,
    #[serde(with = "crate::b32_hex")]
    pub bellatrix_fork_version: B32,
    pub bellatrix_fork_epoch: u64,
    #[serde(with = "crate::b32_hex")]
    pub capella_fork_version: B32,
    pub capella_fork_epoch: u64,
    #[serde(with = "crate::b32_hex")]
    pub deneb_fork_version: B32,
    pub deneb_fork_epoch: u64,
    #[serde(with = "crate::b32_hex")]
    pub electra_fork_version: B32,
    pub electra_fork_epoch: u64,

    // Time parameters
    pub seconds_per_slot: u64,

    // Networking
    pub attestation_propagation_slot_range: u64,
    /// Milliseconds
    pub maximum_gossip_clock_disparity: u64,
    pub attestation_subnet_count: u64,
}

impl BeaconNetworkSpec {
    /// Fork version active at ``epoch``.
    pub fn fork_version_at_epoch(&self, epoch: u64) -> B32 {
        [
            (self.electra_fork_epoch, self.electra_fork_version),
            (self.deneb_fork_epoch, self.deneb_fork_version),
            (self.capella_fork_epoch, self.capella_fork_version),
            (self.bellatrix_fork_epoch, self.bellatrix_fork_version),
            (self.altair_fork_epoch, self.altair_fork_version),
        ]
        .into_iter()
        .find_map(|(fork_epoch, version)| (epoch >= fork_epoch).then_some(version))
        .unwrap_or(self.genesis_fork_version)
    }

    pub fn is_electra_active(&self, epoch: u64) -> bool {
        epoch >= self.electra_fork_epoch
    }

    pub fn fork_digest_at_epoch(&self, epoch: u64, genesis_validators_root: B256) -> B32 {
        compute_fork_digest(self.fork_version_at_epoch(epoch), genesis_validators_root)
    }

    pub fn fork_digest(&self, genesis_validators_root: B256) -> B32 {
        compute_fork_digest(self.electra_fork_version, genesis_validators_root)
    }
}

pub static MAINNET: LazyLock<Arc<BeaconNetworkSpec>> = LazyLock::new(|| {
    BeaconNetworkSpec {
        preset_base: "mainnet".to_string(),
        network: Network::Mainnet,
        genesis_fork_version: fixed_bytes!("0x00000000"),
        altair_fork_version: fixed_bytes!("0x01000000"),
        altair_fork_epoch: 74240,
        bellatrix_fork_version: fixed_bytes!("0x02000000"),
        bellatrix_fork_epoch: 144896,
        capella_fork_version: fixed_bytes!("0x03000000"),
        capella_fork_epoch: 194048,
        deneb_fork_version: fixed_bytes!("0x04000000"),
        deneb_fork_epoch: 269568,
        electra_fork_version: fixed_bytes!("0x05000000"),
        electra_fork_epoch: 364032,
        seconds_per_slot: 12,
        attestation_propagation_slot_range: 32,
        maximum_gossip_clock_disparity: 500,
        attestation_subnet_count: 64,
    }
    .into()
});

pub static SEPOLIA: LazyLock<Arc<BeaconNetworkSpec>> = LazyLock::new(|| {
    BeaconNetworkSpec {
        preset_base: "mainnet".to_string(),
        network: Network::Sepolia,
        genesis_fork_version: fixed_bytes!("0x90000069"),
        altair_fork_version: fixed_bytes!("0x90000070"),
        altair_fork_epoch: 50,
        bellatrix_fork_version: fixed_bytes!("0x90000071"),
        bellatrix_fork_epoch: 100,
        capella_fork_version: fixed_bytes!("0x90000072"),
        capella_fork_epoch: 56832,
        deneb_fork_version: fixed_bytes!("0x90000073"),
        deneb_fork_epoch: 132608,
        electra_fork_version: fixed_bytes!("0x90000074"),
        electra_fork_epoch: 222464,
        seconds_per_slot: 12,
        attestation_propagation_slot_range: 32,
        maximum_gossip_clock_disparity: 500,
        attestation_subnet_count: 64,
    }
    .into()
});

pub static HOODI: LazyLock<Arc<BeaconNetworkSpec>> = LazyLock::new(|| {
    BeaconNetworkSpec {
        preset_base: "mainnet".to_string(),
        network: Network::Hoodi,
        genesis_fork_version: fixed_bytes!("0x10000910"),
        altair_fork_version: fixed_bytes!("0x20000910"),
        altair_fork_epoch: 0,
        bellatrix_fork_version: fixed_bytes!("0x30000910"),
        bellatrix_fork_epoch: 0,
        capella_fork_version: fixed_bytes!("0x40000910"),
        capella_fork_epoch: 0,
        deneb_fork_version: fixed_bytes!("0x50000910"),
        deneb_fork_epoch: 0,
        electra_fork_version: fixed_bytes!("0x60000910"),
        electra_fork_epoch: 2048,
        seconds_per_slot: 12,
        attestation_propagation_slot_range: 32,
        maximum_gossip_clock_disparity: 500,
        attestation_subnet_count: 64,
    }
    .into()
});

/// Every fork active from genesis.
pub static DEV: LazyLock<Arc<BeaconNetworkSpec>> = LazyLock::new(|| {
    BeaconNetworkSpec {
        preset_base: "mainnet".to_string(),
        network: Network::Dev,
        genesis_fork_version: fixed_bytes!("0x00000000"),
        altair_fork_version: fixed_bytes!("0x01000000"),
        altair_fork_epoch: 0,
        bellatrix_fork_version: fixed_bytes!("0x02000000"),
        bellatrix_fork_epoch: 0,
        capella_fork_version: fixed_bytes!("0x03000000"),
        capella_fork_epoch: 0,
        deneb_fork_version: fixed_bytes!("0x04000000"),
        deneb_fork_epoch: 0,
        electra_fork_version: fixed_bytes!("0x05000000"),
        electra_fork_epoch: 0,
        seconds_per_slot: 12,
        attestation_propagation_slot_range: 32,
        maximum_gossip_clock_disparity: 500,
        attestation_subnet_count: 64,
    }
    .into()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_version_at_epoch() {
        assert_eq!(MAINNET.fork_version_at_epoch(0), fixed_bytes!("0x00000000"));
        assert_eq!(
            MAINNET.fork_version_at_epoch(269567),
            fixed_bytes!("0x03000000")
        );
        assert_eq!(
            MAINNET.fork_version_at_epoch(364032),
            fixed_bytes!("0x05000000")
        );
        assert!(!MAINNET.is_electra_active(364031));
        assert!(DEV.is_electra_active(0));
    }

    #[test]
    fn test_fork_digest_changes_across_forks() {
        assert_eq!(
            DEV.fork_digest(B256::ZERO),
            DEV.fork_digest_at_epoch(0, B256::ZERO)
        );
        assert_ne!(
            MAINNET.fork_digest_at_epoch(0, B256::ZERO),
            MAINNET.fork_digest(B256::ZERO)
        );
    }
}
