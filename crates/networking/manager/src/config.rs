use std::{num::NonZeroUsize, thread::available_parallelism, time::Duration};

use clap::Args;
use ream_consensus_misc::constants::beacon::SLOTS_PER_EPOCH;

pub const DEFAULT_PENDING_ATTS_LIMIT: usize = 10_000;
pub const DEFAULT_VERIFIER_LIMIT: usize = 50;
pub const DEFAULT_VERIFICATION_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_SEEN_CACHE_SIZE: usize = 2_048;
pub const DEFAULT_PRUNE_INTERVAL_SLOTS: u64 = 1;
pub const DEFAULT_ATTESTATION_POOL_RETENTION_SLOTS: u64 = 2 * SLOTS_PER_EPOCH;

pub fn default_verifier_workers() -> usize {
    available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// Tunables of the attestation admission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ManagerConfig {
    #[arg(
        long,
        help = "Maximum number of distinct unknown block roots with buffered attestations",
        default_value_t = DEFAULT_PENDING_ATTS_LIMIT
    )]
    pub pending_atts_limit: usize,

    #[arg(
        long,
        help = "Capacity of the signature verification job queue",
        default_value_t = DEFAULT_VERIFIER_LIMIT
    )]
    pub verifier_limit: usize,

    #[arg(
        long,
        help = "Number of signature verification workers",
        default_value_t = default_verifier_workers()
    )]
    pub verifier_workers: usize,

    #[arg(
        long,
        help = "Slots a buffered attestation is retained while its block is missing",
        default_value_t = SLOTS_PER_EPOCH
    )]
    pub pending_retention_slots: u64,

    #[arg(
        long,
        help = "Milliseconds to wait for a signature verification result",
        default_value_t = DEFAULT_VERIFICATION_TIMEOUT_MS
    )]
    pub verification_timeout_ms: u64,

    #[arg(
        long,
        help = "Number of (slot, committee) keys kept in the seen-attestation cache",
        default_value_t = DEFAULT_SEEN_CACHE_SIZE
    )]
    pub seen_cache_size: usize,

    #[arg(
        long,
        help = "Prune and retry pending attestations every this many slots",
        default_value_t = DEFAULT_PRUNE_INTERVAL_SLOTS
    )]
    pub prune_interval_slots: u64,

    #[arg(
        long,
        help = "Slots an accepted attestation is kept in the attestation pool",
        default_value_t = DEFAULT_ATTESTATION_POOL_RETENTION_SLOTS
    )]
    pub attestation_pool_retention_slots: u64,
}

impl ManagerConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            pending_atts_limit: DEFAULT_PENDING_ATTS_LIMIT,
            verifier_limit: DEFAULT_VERIFIER_LIMIT,
            verifier_workers: default_verifier_workers(),
            pending_retention_slots: SLOTS_PER_EPOCH,
            verification_timeout_ms: DEFAULT_VERIFICATION_TIMEOUT_MS,
            seen_cache_size: DEFAULT_SEEN_CACHE_SIZE,
            prune_interval_slots: DEFAULT_PRUNE_INTERVAL_SLOTS,
            attestation_pool_retention_slots: DEFAULT_ATTESTATION_POOL_RETENTION_SLOTS,
        }
    }
}
