use alloy_primitives::B256;
use ream_p2p::channel::{GossipMessage, P2PMessage, P2PRequest};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::sink::NetworkSink;

pub struct P2PSender(pub mpsc::UnboundedSender<P2PMessage>);

impl P2PSender {
    pub fn send_gossip(&self, message: GossipMessage) {
        if let Err(err) = self.0.send(P2PMessage::Gossip(message)) {
            warn!("Failed to send gossip message: {err}");
        }
    }

    pub fn send_block_roots_request(&self, roots: Vec<B256>) {
        debug!("Requesting block by root: {roots:?}");
        if let Err(err) = self
            .0
            .send(P2PMessage::Request(P2PRequest::BlockRoots { roots }))
        {
            warn!("Failed to send block roots request: {err}");
        }
    }
}

impl NetworkSink for P2PSender {
    fn rebroadcast(&self, message: GossipMessage) {
        self.send_gossip(message);
    }

    fn request_block_by_root(&self, block_root: B256) {
        self.send_block_roots_request(vec![block_root]);
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::aliases::B32;
    use ream_p2p::gossipsub::topics::{GossipTopic, GossipTopicKind};
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn test_sender_forwards_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = P2PSender(tx);

        sender.request_block_by_root(B256::repeat_byte(1));
        sender.rebroadcast(GossipMessage {
            topic: GossipTopic {
                fork: B32::ZERO,
                kind: GossipTopicKind::BeaconAggregateAndProof,
            },
            data: vec![1, 2, 3],
        });

        assert!(matches!(
            rx.try_recv(),
            Ok(P2PMessage::Request(P2PRequest::BlockRoots { roots })) if roots == vec![B256::repeat_byte(1)]
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(P2PMessage::Gossip(GossipMessage { data, .. })) if data == vec![1, 2, 3]
        ));
    }

    #[test]
    #[traced_test]
    fn test_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        P2PSender(tx).request_block_by_root(B256::ZERO);

        assert!(logs_contain("Requesting block by root"));
        assert!(logs_contain("Failed to send block roots request"));
    }
}
