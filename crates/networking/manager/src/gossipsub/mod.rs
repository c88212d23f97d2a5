pub mod attestation;
pub mod pending_attestations;
pub mod seen_cache;
pub mod validate;
