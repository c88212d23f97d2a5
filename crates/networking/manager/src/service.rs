use std::{sync::Arc, time::Duration};

use alloy_primitives::{B256, aliases::B32};
use libp2p::gossipsub::TopicHash;
use ream_bls::traits::SignatureVerifier;
use ream_consensus_misc::misc::compute_epoch_at_slot;
use ream_executor::ReamExecutor;
use ream_metrics::{ATTESTATION_GOSSIP_VERDICTS, inc_int_counter_vec};
use ream_network_spec::networks::BeaconNetworkSpec;
use ream_p2p::gossipsub::{
    error::GossipsubError,
    message::GossipsubMessage,
    topics::{GossipTopic, GossipTopicKind},
};
use tokio::{sync::Mutex, task::JoinHandle, time::interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    block_arrival::BlockArrivalHook,
    chain::ChainProvider,
    config::ManagerConfig,
    gossipsub::{
        attestation::GossipAttestation,
        pending_attestations::PendingAttestationQueue,
        validate::{GossipValidator, Origin, result::ValidationResult},
    },
    sink::{AttestationSink, NetworkSink},
    verification_pool::SignatureVerificationPool,
};

/// Services owned by the rest of the node which attestation admission reads from or feeds.
pub struct AttestationCollaborators {
    pub chain: Arc<dyn ChainProvider>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub attestation_sink: Arc<dyn AttestationSink>,
    pub network: Arc<dyn NetworkSink>,
    /// The lock block import holds while mutating fork choice.
    pub import_lock: Arc<Mutex<()>>,
}

/// Entry point of attestation admission: gossip validation, buffering of attestations for
/// unknown blocks, and their replay once the block is imported.
pub struct AttestationService {
    config: ManagerConfig,
    network_spec: Arc<BeaconNetworkSpec>,
    chain: Arc<dyn ChainProvider>,
    attestation_sink: Arc<dyn AttestationSink>,
    network: Arc<dyn NetworkSink>,
    validator: Arc<GossipValidator>,
    pending_attestations: Arc<PendingAttestationQueue>,
    verification_pool: Arc<SignatureVerificationPool>,
    block_arrival: BlockArrivalHook,
    executor: ReamExecutor,
    cancellation_token: CancellationToken,
}

impl AttestationService {
    pub fn new(
        config: ManagerConfig,
        network_spec: Arc<BeaconNetworkSpec>,
        collaborators: AttestationCollaborators,
        executor: ReamExecutor,
    ) -> Self {
        let AttestationCollaborators {
            chain,
            verifier,
            attestation_sink,
            network,
            import_lock,
        } = collaborators;

        let pending_attestations = Arc::new(PendingAttestationQueue::new(config.pending_atts_limit));
        let verification_pool = Arc::new(SignatureVerificationPool::new(
            verifier,
            config.verifier_workers,
            config.verifier_limit,
            &executor,
        ));
        let validator = Arc::new(GossipValidator::new(
            &config,
            network_spec.clone(),
            chain.clone(),
            pending_attestations.clone(),
            verification_pool.clone(),
            attestation_sink.clone(),
            network.clone(),
        ));
        let block_arrival = BlockArrivalHook::new(
            validator.clone(),
            pending_attestations.clone(),
            network.clone(),
            import_lock,
        );
        let cancellation_token = executor.cancellation_token().child_token();

        Self {
            config,
            network_spec,
            chain,
            attestation_sink,
            network,
            validator,
            pending_attestations,
            verification_pool,
            block_arrival,
            executor,
            cancellation_token,
        }
    }

    /// Decodes and validates a message from an attestation topic. Never fails, an internal error
    /// is reported as [ValidationResult::Ignore].
    pub async fn validate_gossip_attestation(
        &self,
        topic: &TopicHash,
        data: &[u8],
    ) -> ValidationResult {
        let current_epoch = compute_epoch_at_slot(self.chain.current_slot());
        let result = match GossipsubMessage::decode(
            topic,
            data,
            self.fork_digest(),
            self.network_spec.is_electra_active(current_epoch),
        ) {
            Ok(message) => {
                let attestation = GossipAttestation::from(message);
                match self.validator.validate(&attestation, Origin::Gossip).await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!("Failed to validate gossip attestation: {err:?}");
                        ValidationResult::Ignore(format!("Internal validation error: {err}"))
                    }
                }
            }
            Err(GossipsubError::InvalidTopic(err)) => ValidationResult::Ignore(err),
            Err(GossipsubError::InvalidData(err)) => ValidationResult::Reject(err),
        };

        let topic_label = match GossipTopic::from_topic_hash(topic).map(|topic| topic.kind) {
            Ok(GossipTopicKind::BeaconAttestation(_)) => "beacon_attestation",
            Ok(GossipTopicKind::BeaconAggregateAndProof) => "beacon_aggregate_and_proof",
            _ => "other",
        };
        inc_int_counter_vec(
            &ATTESTATION_GOSSIP_VERDICTS,
            &[topic_label, result.verdict()],
        );
        match &result {
            ValidationResult::Accept => trace!("Accepted gossip message on {topic}"),
            ValidationResult::Ignore(reason) => trace!("Ignored gossip message on {topic}: {reason}"),
            ValidationResult::Reject(reason) => debug!("Rejected gossip message on {topic}: {reason}"),
        }

        result
    }

    /// Replays attestations buffered for ``block_root``. Returns the number accepted.
    pub async fn on_block_imported(&self, block_root: B256) -> usize {
        self.block_arrival.on_block_imported(block_root).await
    }

    /// Prunes the pending queue and the attestation pool, replays roots whose block became known
    /// and asks the network for the ones still missing.
    pub async fn process_pending_attestations(&self, current_slot: u64) {
        self.pending_attestations
            .prune(current_slot, self.config.pending_retention_slots);
        self.attestation_sink
            .prune(current_slot, self.config.attestation_pool_retention_slots);

        let mut missing_roots = vec![];
        for root in self.pending_attestations.roots() {
            if self.chain.is_block_known(root).await {
                self.block_arrival.on_block_imported(root).await;
            } else {
                missing_roots.push(root);
            }
        }

        if !missing_roots.is_empty() {
            debug!(
                "Requesting block by root for {} pending attestation roots",
                missing_roots.len()
            );
        }
        for root in missing_roots {
            self.network.request_block_by_root(root);
        }
    }

    /// Spawns the per-slot maintenance loop.
    pub fn start(self: Arc<Self>) -> JoinHandle<Option<()>> {
        let service = self.clone();
        self.executor
            .spawn(async move { service.run().await }, "attestation-service")
    }

    async fn run(&self) {
        info!(
            "Attestation service started: pending_atts_limit: {}, verifier_workers: {}",
            self.config.pending_atts_limit, self.config.verifier_workers
        );

        let mut interval = interval(Duration::from_secs(
            self.network_spec.seconds_per_slot.max(1),
        ));
        let prune_interval_slots = self.config.prune_interval_slots.max(1);
        let mut last_processed_slot: Option<u64> = None;

        loop {
            tokio::select! {
                _ = self.cancellation_token.cancelled() => break,
                _ = interval.tick() => {
                    let current_slot = self.chain.current_slot();
                    if last_processed_slot
                        .is_some_and(|slot| current_slot < slot + prune_interval_slots)
                    {
                        continue;
                    }
                    last_processed_slot = Some(current_slot);
                    self.process_pending_attestations(current_slot).await;
                }
            }
        }

        info!("Attestation service stopped");
    }

    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
        self.verification_pool.shutdown();
    }

    pub fn fork_digest(&self) -> B32 {
        self.validator.fork_digest()
    }

    pub fn pending_attestations(&self) -> &PendingAttestationQueue {
        &self.pending_attestations
    }

    pub fn verification_pool(&self) -> &SignatureVerificationPool {
        &self.verification_pool
    }
}
