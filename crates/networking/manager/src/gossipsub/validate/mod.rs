pub mod aggregate_and_proof;
pub mod ancestry;
pub mod beacon_attestation;
pub mod result;

use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use alloy_primitives::{B256, aliases::B32};
use ream_bls::PubKey;
use ream_consensus_misc::{
    attestation_data::AttestationData,
    misc::{compute_domain, compute_epoch_at_slot, compute_start_slot_at_epoch},
};
use ream_network_spec::networks::BeaconNetworkSpec;
use tracing::debug;

use self::{
    aggregate_and_proof::validate_aggregate_and_proof,
    ancestry::get_checkpoint_block,
    beacon_attestation::validate_beacon_attestation,
    result::ValidationResult,
};
use super::{
    attestation::GossipAttestation,
    pending_attestations::{PendingAttestationQueue, SaveOutcome},
    seen_cache::{ObservedIndices, SeenCache},
};
use crate::{
    chain::{ChainError, ChainProvider},
    config::ManagerConfig,
    sink::{AttestationSink, NetworkSink},
    verification_pool::{SignatureSet, SignatureVerificationPool},
};

/// Where an attestation under validation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fresh from the network.
    Gossip,
    /// Replayed from the pending queue after its block was imported. Timing checks are skipped,
    /// the retention window bounds the age of these.
    Pending,
}

/// Runs the gossip checks for unaggregated and aggregate attestations and hands accepted ones
/// to the attestation sink.
pub struct GossipValidator {
    pub(crate) chain: Arc<dyn ChainProvider>,
    pub(crate) network_spec: Arc<BeaconNetworkSpec>,
    pub(crate) seen_cache: SeenCache,
    pub(crate) observed_attesters: ObservedIndices,
    pub(crate) observed_aggregators: ObservedIndices,
    pub(crate) pending_attestations: Arc<PendingAttestationQueue>,
    pub(crate) verification_pool: Arc<SignatureVerificationPool>,
    pub(crate) attestation_sink: Arc<dyn AttestationSink>,
    pub(crate) network: Arc<dyn NetworkSink>,
    verification_timeout: Duration,
}

impl GossipValidator {
    pub fn new(
        config: &ManagerConfig,
        network_spec: Arc<BeaconNetworkSpec>,
        chain: Arc<dyn ChainProvider>,
        pending_attestations: Arc<PendingAttestationQueue>,
        verification_pool: Arc<SignatureVerificationPool>,
        attestation_sink: Arc<dyn AttestationSink>,
        network: Arc<dyn NetworkSink>,
    ) -> Self {
        let cache_size = NonZeroUsize::new(config.seen_cache_size).unwrap_or(NonZeroUsize::MIN);
        // One entry per validator and epoch, so these hold many more keys than the seen cache
        let observed_size = NonZeroUsize::new(config.seen_cache_size.saturating_mul(64))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            chain,
            network_spec,
            seen_cache: SeenCache::new(cache_size),
            observed_attesters: ObservedIndices::new(observed_size),
            observed_aggregators: ObservedIndices::new(observed_size),
            pending_attestations,
            verification_pool,
            attestation_sink,
            network,
            verification_timeout: config.verification_timeout(),
        }
    }

    pub async fn validate(
        &self,
        attestation: &GossipAttestation,
        origin: Origin,
    ) -> anyhow::Result<ValidationResult> {
        match attestation {
            GossipAttestation::Unaggregated {
                attestation,
                subnet_id,
            } => validate_beacon_attestation(self, attestation, *subnet_id, origin).await,
            GossipAttestation::Aggregate(aggregate) => {
                validate_aggregate_and_proof(self, aggregate, origin).await
            }
        }
    }

    /// Fork digest of the current epoch, the only one gossip is accepted under.
    pub fn fork_digest(&self) -> B32 {
        self.network_spec.fork_digest_at_epoch(
            compute_epoch_at_slot(self.chain.current_slot()),
            self.chain.genesis_validators_root(),
        )
    }

    pub(crate) fn domain(&self, domain_type: B32, epoch: u64) -> B256 {
        compute_domain(
            domain_type,
            self.network_spec.fork_version_at_epoch(epoch),
            self.chain.genesis_validators_root(),
        )
    }

    pub(crate) fn check_propagation_range(&self, slot: u64) -> Option<ValidationResult> {
        let current_slot = self.chain.current_slot();

        // [IGNORE] attestation.data.slot is equal to or earlier than the current_slot
        if slot > current_slot {
            return Some(ValidationResult::Ignore(
                "Attestation is from a future slot".to_string(),
            ));
        }

        // [IGNORE] attestation.data.slot is within the last ATTESTATION_PROPAGATION_SLOT_RANGE
        // slots
        if slot + self.network_spec.attestation_propagation_slot_range < current_slot {
            return Some(ValidationResult::Ignore(
                "Attestation is outside the propagation slot range".to_string(),
            ));
        }

        None
    }

    /// Block-dependent checks shared by both attestation kinds. An attestation for an unknown
    /// block which came from gossip is buffered until the block is imported.
    pub(crate) async fn check_voted_block(
        &self,
        data: &AttestationData,
        origin: Origin,
        to_pending: impl FnOnce() -> GossipAttestation,
    ) -> anyhow::Result<Option<ValidationResult>> {
        let block_root = data.beacon_block_root;

        // [IGNORE] The block being voted for (attestation.data.beacon_block_root) has been seen
        // (a client MAY queue attestations for processing once block is retrieved).
        if !self.chain.is_block_known(block_root).await {
            if origin == Origin::Gossip {
                let outcome = self.pending_attestations.save(block_root, to_pending());
                if outcome == SaveOutcome::NewRoot {
                    self.network.request_block_by_root(block_root);
                }
            }
            return Ok(Some(ValidationResult::Ignore(
                "The block being voted for has not been seen".to_string(),
            )));
        }

        // [REJECT] The block being voted for (attestation.data.beacon_block_root) passes
        // validation.
        if self.chain.is_invalid_block(block_root).await {
            return Ok(Some(ValidationResult::Reject(
                "The block being voted for failed validation".to_string(),
            )));
        }

        if self.chain.is_block_below_finalized(block_root).await {
            return Ok(Some(ValidationResult::Reject(
                "The block being voted for is older than the finalized checkpoint".to_string(),
            )));
        }

        let finalized_checkpoint = self.chain.finalized_checkpoint().await;
        let finalized_slot = compute_start_slot_at_epoch(finalized_checkpoint.epoch);

        // [REJECT] The attestation's target block is an ancestor of the block named in the LMD
        // vote
        match get_checkpoint_block(
            self.chain.as_ref(),
            block_root,
            data.target.epoch,
            finalized_slot,
        )
        .await
        {
            Ok(Some(target_root)) if target_root == data.target.root => {}
            Ok(Some(_)) => {
                return Ok(Some(ValidationResult::Reject(
                    "The target block is not an ancestor of the LMD vote block".to_string(),
                )));
            }
            Ok(None) => {
                return Ok(Some(ValidationResult::Ignore(
                    "An ancestor of the block being voted for is unknown".to_string(),
                )));
            }
            Err(err) => {
                return Ok(Some(ValidationResult::Ignore(format!(
                    "Could not resolve the target block: {err}"
                ))));
            }
        }

        // [IGNORE] The current finalized_checkpoint is an ancestor of the block defined by
        // attestation.data.beacon_block_root
        match get_checkpoint_block(
            self.chain.as_ref(),
            block_root,
            finalized_checkpoint.epoch,
            finalized_slot,
        )
        .await
        {
            Ok(Some(root)) if root == finalized_checkpoint.root => Ok(None),
            _ => Ok(Some(ValidationResult::Ignore(
                "Finalized checkpoint is not an ancestor of the block being voted for".to_string(),
            ))),
        }
    }

    pub(crate) async fn public_keys(&self, indices: &[u64]) -> Result<Vec<PubKey>, ChainError> {
        let mut public_keys = Vec::with_capacity(indices.len());
        for index in indices {
            public_keys.push(self.chain.validator_public_key(*index).await?);
        }
        Ok(public_keys)
    }

    /// Runs ``sets`` through the verification pool. `None` means every signature is valid.
    pub(crate) async fn verify_signature_sets(
        &self,
        sets: Vec<SignatureSet>,
        kind: &'static str,
    ) -> Option<ValidationResult> {
        match self
            .verification_pool
            .verify(sets, kind, self.verification_timeout)
            .await
        {
            Ok(true) => None,
            Ok(false) => Some(ValidationResult::Reject(format!("Invalid {kind} signature"))),
            Err(err) => {
                debug!("Could not verify {kind} signature: {err}");
                Some(ValidationResult::Ignore(format!(
                    "Signature verification unavailable: {err}"
                )))
            }
        }
    }
}
