use crate::{errors::BLSError, pubkey::PubKey, signature::BLSSignature};

/// The cryptographic primitive behind signature checks.
///
/// Gossip validation never calls this directly, verification jobs are scheduled onto a bounded
/// worker pool which owns an implementation of this trait.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies a BLS signature against a public key and message.
    ///
    /// # Returns
    /// * `Result<bool, BLSError>` - Ok(true) if the signature is valid, Ok(false) if verification
    ///   fails, or Err if there are issues with signature or public key bytes
    fn verify(
        &self,
        pubkey: &PubKey,
        message: &[u8],
        signature: &BLSSignature,
    ) -> Result<bool, BLSError>;

    /// Verifies the signature against a message using an aggregate of multiple public keys
    fn fast_aggregate_verify(
        &self,
        pubkeys: &[&PubKey],
        message: &[u8],
        signature: &BLSSignature,
    ) -> Result<bool, BLSError>;
}
