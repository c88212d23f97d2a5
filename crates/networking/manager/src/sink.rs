use alloy_primitives::B256;
use ream_operation_pool::OperationPool;
use ream_p2p::channel::GossipMessage;

use crate::gossipsub::validate::result::VerifiedAttestation;

/// Destination of attestations which passed validation.
pub trait AttestationSink: Send + Sync {
    fn submit_attestation(&self, verified: &VerifiedAttestation, aggregated: bool);

    /// Drops attestations older than the last ``retention_slots`` slots.
    fn prune(&self, current_slot: u64, retention_slots: u64);
}

impl AttestationSink for OperationPool {
    fn submit_attestation(&self, verified: &VerifiedAttestation, aggregated: bool) {
        self.insert_attestation(verified.attestation.clone(), aggregated);
    }

    fn prune(&self, current_slot: u64, retention_slots: u64) {
        self.prune_attestations(current_slot, retention_slots);
    }
}

/// Outbound network actions, both are fire-and-forget.
pub trait NetworkSink: Send + Sync {
    fn rebroadcast(&self, message: GossipMessage);

    fn request_block_by_root(&self, block_root: B256);
}
