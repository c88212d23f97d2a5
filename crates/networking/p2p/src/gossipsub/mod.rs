//! https://ethereum.github.io/consensus-specs/specs/phase0/p2p-interface/#the-gossip-domain-gossipsub

pub mod error;
pub mod message;
pub mod topics;
