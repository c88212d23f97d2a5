pub mod errors;
pub mod pubkey;
pub mod signature;
#[cfg(feature = "supranational")]
pub mod supranational;
pub mod traits;

pub use pubkey::PubKey;
pub use signature::BLSSignature;

/// Domain separation tag of the proof-of-possession ciphersuite used by the beacon chain.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
