use libp2p::gossipsub::MessageAcceptance;
use ream_consensus_beacon::attestation_record::AttestationRecord;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ValidationResult {
    Accept,
    Ignore(String),
    Reject(String),
}

impl ValidationResult {
    pub fn verdict(&self) -> &'static str {
        match self {
            ValidationResult::Accept => "accept",
            ValidationResult::Ignore(_) => "ignore",
            ValidationResult::Reject(_) => "reject",
        }
    }
}

impl From<&ValidationResult> for MessageAcceptance {
    fn from(result: &ValidationResult) -> Self {
        match result {
            ValidationResult::Accept => MessageAcceptance::Accept,
            ValidationResult::Ignore(_) => MessageAcceptance::Ignore,
            ValidationResult::Reject(_) => MessageAcceptance::Reject,
        }
    }
}

/// An accepted attestation together with the validator metadata resolved while checking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAttestation {
    /// Single attestations are converted to the aggregate form.
    pub attestation: AttestationRecord,
    pub committee: Vec<u64>,
    pub attesting_indices: Vec<u64>,
    pub aggregator_index: Option<u64>,
    pub subnet_id: Option<u64>,
}

impl VerifiedAttestation {
    pub fn is_aggregated(&self) -> bool {
        self.attestation.is_aggregated()
    }
}
