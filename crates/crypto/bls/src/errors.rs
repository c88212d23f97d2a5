use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum BLSError {
    #[error("Invalid byte length")]
    InvalidByteLength,
    #[error("Invalid hex string")]
    InvalidHexString,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("No public keys to verify against")]
    EmptyPublicKeys,
    #[cfg(feature = "supranational")]
    #[error("blst error: {0}")]
    BlstError(String),
}
