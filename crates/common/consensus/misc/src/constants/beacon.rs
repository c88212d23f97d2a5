use alloy_primitives::{aliases::B32, fixed_bytes};

pub const DOMAIN_AGGREGATE_AND_PROOF: B32 = fixed_bytes!("0x06000000");
pub const DOMAIN_BEACON_ATTESTER: B32 = fixed_bytes!("0x01000000");
pub const DOMAIN_SELECTION_PROOF: B32 = fixed_bytes!("0x05000000");
pub const MAX_COMMITTEES_PER_SLOT: u64 = 64;
pub const SLOTS_PER_EPOCH: u64 = 32;
pub const TARGET_AGGREGATORS_PER_COMMITTEE: u64 = 16;
