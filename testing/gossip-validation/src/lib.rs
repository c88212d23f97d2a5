//! In-memory collaborators for driving attestation admission end to end.
//!
//! Signatures are fake: [MockVerifier] accepts a signature whose first 32 bytes equal the signed
//! message, which is what [sign] produces.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use alloy_primitives::{B256, aliases::B32};
use async_trait::async_trait;
use libp2p::gossipsub::{IdentTopic as Topic, TopicHash};
use parking_lot::{Mutex, RwLock};
use ream_bls::{BLSSignature, PubKey, errors::BLSError, traits::SignatureVerifier};
use ream_consensus_beacon::{
    aggregate_and_proof::{
        AggregateAndProof, Phase0AggregateAndProof, SignedAggregateAndProof,
        SignedPhase0AggregateAndProof,
    },
    attestation::Attestation,
    phase0::Phase0Attestation,
    single_attestation::SingleAttestation,
};
use ream_consensus_misc::{
    attestation_data::AttestationData,
    checkpoint::Checkpoint,
    constants::beacon::{
        DOMAIN_AGGREGATE_AND_PROOF, DOMAIN_BEACON_ATTESTER, DOMAIN_SELECTION_PROOF,
        SLOTS_PER_EPOCH,
    },
    misc::{compute_domain, compute_epoch_at_slot, compute_signing_root},
};
use ream_executor::ReamExecutor;
use ream_network_manager::{
    chain::{BlockSummary, ChainError, ChainProvider},
    config::ManagerConfig,
    service::{AttestationCollaborators, AttestationService},
    sink::NetworkSink,
};
use ream_network_spec::networks::BeaconNetworkSpec;
use ream_operation_pool::OperationPool;
use ream_p2p::{
    channel::GossipMessage,
    gossipsub::topics::{GossipTopic, GossipTopicKind},
};
use ssz_types::{BitList, BitVector};

pub const COMMITTEE_SIZE: u64 = 8;
pub const GENESIS_VALIDATORS_ROOT: B256 = B256::repeat_byte(0x42);

pub fn genesis_root() -> B256 {
    B256::repeat_byte(0x01)
}

/// A chain with one committee per slot. The committee of a slot is made of
/// [COMMITTEE_SIZE] consecutive validator indices, so every validator attests once per epoch.
pub struct InMemoryChain {
    current_slot: AtomicU64,
    blocks: RwLock<HashMap<B256, BlockSummary>>,
    invalid_blocks: RwLock<HashSet<B256>>,
    finalized_checkpoint: RwLock<Checkpoint>,
}

impl InMemoryChain {
    pub fn new(current_slot: u64) -> Self {
        let blocks = HashMap::from([(
            genesis_root(),
            BlockSummary {
                slot: 0,
                parent_root: B256::ZERO,
            },
        )]);

        Self {
            current_slot: AtomicU64::new(current_slot),
            blocks: RwLock::new(blocks),
            invalid_blocks: RwLock::new(HashSet::new()),
            finalized_checkpoint: RwLock::new(Checkpoint {
                epoch: 0,
                root: genesis_root(),
            }),
        }
    }

    pub fn set_current_slot(&self, slot: u64) {
        self.current_slot.store(slot, Ordering::Release);
    }

    pub fn add_block(&self, root: B256, slot: u64, parent_root: B256) {
        self.blocks
            .write()
            .insert(root, BlockSummary { slot, parent_root });
    }

    pub fn mark_invalid(&self, root: B256) {
        self.invalid_blocks.write().insert(root);
    }

    pub fn set_finalized_checkpoint(&self, checkpoint: Checkpoint) {
        *self.finalized_checkpoint.write() = checkpoint;
    }

    pub fn committee(slot: u64) -> Vec<u64> {
        let first = (slot % SLOTS_PER_EPOCH) * COMMITTEE_SIZE;
        (first..first + COMMITTEE_SIZE).collect()
    }

    pub fn public_key(validator_index: u64) -> PubKey {
        let mut bytes = [0u8; 48];
        bytes[..8].copy_from_slice(&validator_index.to_le_bytes());
        bytes[47] = 0xff;
        PubKey::from_slice(&bytes).expect("48 bytes make a public key")
    }
}

#[async_trait]
impl ChainProvider for InMemoryChain {
    fn current_slot(&self) -> u64 {
        self.current_slot.load(Ordering::Acquire)
    }

    fn genesis_validators_root(&self) -> B256 {
        GENESIS_VALIDATORS_ROOT
    }

    async fn block_summary(&self, block_root: B256) -> Option<BlockSummary> {
        self.blocks.read().get(&block_root).copied()
    }

    async fn finalized_checkpoint(&self) -> Checkpoint {
        *self.finalized_checkpoint.read()
    }

    async fn is_invalid_block(&self, block_root: B256) -> bool {
        self.invalid_blocks.read().contains(&block_root)
    }

    async fn committee_count_per_slot(
        &self,
        block_root: B256,
        _epoch: u64,
    ) -> Result<u64, ChainError> {
        if !self.blocks.read().contains_key(&block_root) {
            return Err(ChainError::StateUnavailable(block_root));
        }
        Ok(1)
    }

    async fn beacon_committee(
        &self,
        block_root: B256,
        slot: u64,
        committee_index: u64,
    ) -> Result<Vec<u64>, ChainError> {
        if !self.blocks.read().contains_key(&block_root) {
            return Err(ChainError::StateUnavailable(block_root));
        }
        if committee_index != 0 {
            return Err(ChainError::CommitteeIndexOutOfRange {
                slot,
                committee_index,
            });
        }
        Ok(Self::committee(slot))
    }

    async fn validator_public_key(&self, validator_index: u64) -> Result<PubKey, ChainError> {
        if validator_index >= SLOTS_PER_EPOCH * COMMITTEE_SIZE {
            return Err(ChainError::UnknownValidator(validator_index));
        }
        Ok(Self::public_key(validator_index))
    }
}

pub fn sign(signing_root: B256) -> BLSSignature {
    let mut bytes = [0x5a; 96];
    bytes[..32].copy_from_slice(signing_root.as_slice());
    BLSSignature::from_slice(&bytes).expect("96 bytes make a signature")
}

pub fn forged_signature() -> BLSSignature {
    BLSSignature::from_slice(&[0xee; 96]).expect("96 bytes make a signature")
}

pub struct MockVerifier {
    pub delay: Duration,
}

impl SignatureVerifier for MockVerifier {
    fn verify(
        &self,
        _pubkey: &PubKey,
        message: &[u8],
        signature: &BLSSignature,
    ) -> Result<bool, BLSError> {
        std::thread::sleep(self.delay);
        Ok(&signature.to_bytes()[..32] == message)
    }

    fn fast_aggregate_verify(
        &self,
        pubkeys: &[&PubKey],
        message: &[u8],
        signature: &BLSSignature,
    ) -> Result<bool, BLSError> {
        let Some(pubkey) = pubkeys.first() else {
            return Err(BLSError::EmptyPublicKeys);
        };
        self.verify(pubkey, message, signature)
    }
}

#[derive(Default)]
pub struct RecordingNetwork {
    pub rebroadcasts: Mutex<Vec<GossipMessage>>,
    pub block_requests: Mutex<Vec<B256>>,
}

impl NetworkSink for RecordingNetwork {
    fn rebroadcast(&self, message: GossipMessage) {
        self.rebroadcasts.lock().push(message);
    }

    fn request_block_by_root(&self, block_root: B256) {
        self.block_requests.lock().push(block_root);
    }
}

pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        verifier_workers: 2,
        ..ManagerConfig::default()
    }
}

/// A service wired to in-memory collaborators. Must be built inside a tokio runtime.
pub struct TestNode {
    pub chain: Arc<InMemoryChain>,
    pub operation_pool: Arc<OperationPool>,
    pub network: Arc<RecordingNetwork>,
    pub network_spec: Arc<BeaconNetworkSpec>,
    pub import_lock: Arc<tokio::sync::Mutex<()>>,
    pub service: Arc<AttestationService>,
}

impl TestNode {
    pub fn new(
        network_spec: Arc<BeaconNetworkSpec>,
        config: ManagerConfig,
        verifier_delay: Duration,
        current_slot: u64,
    ) -> Self {
        let chain = Arc::new(InMemoryChain::new(current_slot));
        let operation_pool = Arc::new(OperationPool::default());
        let network = Arc::new(RecordingNetwork::default());
        let import_lock = Arc::new(tokio::sync::Mutex::new(()));

        let service = Arc::new(AttestationService::new(
            config,
            network_spec.clone(),
            AttestationCollaborators {
                chain: chain.clone(),
                verifier: Arc::new(MockVerifier {
                    delay: verifier_delay,
                }),
                attestation_sink: operation_pool.clone(),
                network: network.clone(),
                import_lock: import_lock.clone(),
            },
            ReamExecutor::current(),
        ));

        Self {
            chain,
            operation_pool,
            network,
            network_spec,
            import_lock,
            service,
        }
    }

    pub fn fork_digest(&self) -> B32 {
        self.service.fork_digest()
    }

    pub fn aggregate_topic(&self) -> TopicHash {
        Topic::from(GossipTopic {
            fork: self.fork_digest(),
            kind: GossipTopicKind::BeaconAggregateAndProof,
        })
        .hash()
    }

    pub fn subnet_topic(&self, subnet_id: u64) -> TopicHash {
        Topic::from(GossipTopic {
            fork: self.fork_digest(),
            kind: GossipTopicKind::BeaconAttestation(subnet_id),
        })
        .hash()
    }

    pub fn domain(&self, domain_type: B32, epoch: u64) -> B256 {
        compute_domain(
            domain_type,
            self.network_spec.fork_version_at_epoch(epoch),
            GENESIS_VALIDATORS_ROOT,
        )
    }

    pub fn attestation_data(&self, slot: u64, block_root: B256, target_root: B256) -> AttestationData {
        AttestationData {
            slot,
            index: 0,
            beacon_block_root: block_root,
            source: Checkpoint {
                epoch: 0,
                root: genesis_root(),
            },
            target: Checkpoint {
                epoch: compute_epoch_at_slot(slot),
                root: target_root,
            },
        }
    }

    fn attestation_signature(&self, data: &AttestationData) -> BLSSignature {
        sign(compute_signing_root(
            data,
            self.domain(DOMAIN_BEACON_ATTESTER, data.target.epoch),
        ))
    }

    fn selection_proof(&self, slot: u64) -> BLSSignature {
        sign(compute_signing_root(
            slot,
            self.domain(DOMAIN_SELECTION_PROOF, compute_epoch_at_slot(slot)),
        ))
    }

    fn aggregation_bits<N: ssz_types::typenum::Unsigned + Clone>(positions: &[usize]) -> BitList<N> {
        let mut aggregation_bits =
            BitList::with_capacity(COMMITTEE_SIZE as usize).expect("committee fits a bitlist");
        for position in positions {
            aggregation_bits
                .set(*position, true)
                .expect("position is within the committee");
        }
        aggregation_bits
    }

    /// A correctly signed post-electra aggregate of committee 0 over ``positions``.
    pub fn signed_aggregate(
        &self,
        data: AttestationData,
        aggregator_index: u64,
        positions: &[usize],
    ) -> SignedAggregateAndProof {
        let mut committee_bits = BitVector::new();
        committee_bits
            .set(0, true)
            .expect("committee 0 is within the bitvector");

        let message = AggregateAndProof {
            aggregator_index,
            aggregate: Attestation {
                aggregation_bits: Self::aggregation_bits(positions),
                signature: self.attestation_signature(&data),
                data: data.clone(),
                committee_bits,
            },
            selection_proof: self.selection_proof(data.slot),
        };
        let signature = sign(compute_signing_root(
            &message,
            self.domain(
                DOMAIN_AGGREGATE_AND_PROOF,
                compute_epoch_at_slot(data.slot),
            ),
        ));

        SignedAggregateAndProof { message, signature }
    }

    /// A correctly signed pre-electra aggregate of committee 0 over ``positions``.
    pub fn signed_phase0_aggregate(
        &self,
        data: AttestationData,
        aggregator_index: u64,
        positions: &[usize],
    ) -> SignedPhase0AggregateAndProof {
        let message = Phase0AggregateAndProof {
            aggregator_index,
            aggregate: Phase0Attestation {
                aggregation_bits: Self::aggregation_bits(positions),
                signature: self.attestation_signature(&data),
                data: data.clone(),
            },
            selection_proof: self.selection_proof(data.slot),
        };
        let signature = sign(compute_signing_root(
            &message,
            self.domain(
                DOMAIN_AGGREGATE_AND_PROOF,
                compute_epoch_at_slot(data.slot),
            ),
        ));

        SignedPhase0AggregateAndProof { message, signature }
    }

    pub fn single_attestation(&self, data: AttestationData, attester_index: u64) -> SingleAttestation {
        SingleAttestation {
            committee_index: 0,
            attester_index,
            signature: self.attestation_signature(&data),
            data,
        }
    }

    pub fn phase0_attestation(&self, data: AttestationData, position: usize) -> Phase0Attestation {
        Phase0Attestation {
            aggregation_bits: Self::aggregation_bits(&[position]),
            signature: self.attestation_signature(&data),
            data,
        }
    }
}
