pub mod aggregate_and_proof;
pub mod attestation;
pub mod attestation_record;
pub mod phase0;
pub mod single_attestation;
