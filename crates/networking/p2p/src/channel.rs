use alloy_primitives::B256;

use crate::gossipsub::topics::GossipTopic;

pub enum P2PMessage {
    Request(P2PRequest),
    Gossip(GossipMessage),
}

pub enum P2PRequest {
    /// Ask peers for blocks which are referenced but haven't been imported.
    BlockRoots { roots: Vec<B256> },
}

#[derive(Debug, Clone)]
pub struct GossipMessage {
    pub topic: GossipTopic,
    pub data: Vec<u8>,
}
