pub mod channel;
pub mod gossipsub;
