//! Message routing
//!
//! Handles: Broadcast, Private

use bytes::Bytes;
use tracing::{debug, info, warn};

use ferry_protocol::{format_broadcast, format_private};

use crate::config::BroadcastPolicy;
use crate::handler::HandlerContext;
use crate::registry::ConnectionHandle;

impl HandlerContext {
    /// Send text to every other connection (or only the first, under
    /// [`BroadcastPolicy::FirstPeer`])
    ///
    /// Returns the number of connections the text was queued for.
    pub async fn handle_broadcast(&self, text: &str) -> usize {
        let line = format_broadcast(&self.clock.now_hms(), self.name(), text);
        let payload = self.frame_text(&line);

        let mut peers = self.registry.peers_except(self.connection.id());
        if self.config.routing.broadcast == BroadcastPolicy::FirstPeer {
            peers.truncate(1);
        }

        let mut delivered = 0;
        for peer in &peers {
            if self.deliver(peer, payload.clone()).await {
                delivered += 1;
            }
        }

        debug!(
            "Broadcast from {} delivered to {}/{} peers",
            self.name(),
            delivered,
            peers.len()
        );
        delivered
    }

    /// Send text to one named connection
    ///
    /// Unknown recipients are dropped silently; the sender gets no notice.
    pub async fn handle_private(&self, recipient: &str, body: &str) -> bool {
        let Some(target) = self.registry.find_by_name(recipient) else {
            debug!(
                "Private message from {} to unknown recipient {:?} dropped",
                self.name(),
                recipient
            );
            return false;
        };

        info!("{} -> {} (private): {}", self.name(), recipient, body);
        let line = format_private(&self.clock.now_hms(), self.name(), body);
        self.deliver(&target, self.frame_text(&line)).await
    }

    /// Queue bytes for `peer`, closing it if its writer is gone
    pub(crate) async fn deliver(&self, peer: &ConnectionHandle, payload: Bytes) -> bool {
        match peer.send(payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Delivery to {} failed, closing it: {}", peer.name(), e);
                peer.close();
                false
            }
        }
    }
}
