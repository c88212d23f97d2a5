pub mod block_arrival;
pub mod chain;
pub mod config;
pub mod gossipsub;
pub mod p2p_sender;
pub mod service;
pub mod sink;
pub mod verification_pool;
