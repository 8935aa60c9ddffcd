//! Disconnection handling
//!
//! Runs once per connection when its handler leaves the listening state.

use std::io::ErrorKind;

use tracing::{debug, info, warn};

use crate::handler::{CloseReason, HandlerContext};

/// What the disconnection path found in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The connection was registered and has been removed, along with
    /// `siblings` other connections holding the same name
    Removed { siblings: usize },
    /// Someone else already removed it (sibling cleanup)
    AlreadyGone,
}

impl HandlerContext {
    /// Remove this connection and close every sibling sharing its name
    pub fn handle_disconnect(&self, reason: &CloseReason) -> DisconnectOutcome {
        let outcome = match self.registry.remove_with_siblings(self.connection.id()) {
            Some(removal) => {
                info!("{} disconnected ({})", removal.name, self.connection.id());
                for sibling in &removal.siblings {
                    sibling.close();
                    info!(
                        "Connection for forwarding file from {} closed ({})",
                        removal.name,
                        sibling.id()
                    );
                }
                DisconnectOutcome::Removed {
                    siblings: removal.siblings.len(),
                }
            }
            None => {
                info!("{} left the room ({})", self.name(), self.connection.id());
                DisconnectOutcome::AlreadyGone
            }
        };

        if self.registry.is_empty() {
            debug!("Room is empty");
        }

        if let CloseReason::Error(e) = reason {
            if e.kind() != ErrorKind::ConnectionReset {
                warn!("Error: {}", e);
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::clock::FixedClock;
    use crate::config::AppConfig;
    use crate::registry::{ConnectionHandle, ConnectionRegistry};

    fn join(registry: &ConnectionRegistry, name: &str) -> (ConnectionHandle, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(4);
        let handle = registry.register(name, tx, CancellationToken::new()).unwrap();
        (handle, rx)
    }

    fn context(registry: &Arc<ConnectionRegistry>, handle: &ConnectionHandle) -> HandlerContext {
        HandlerContext::new(
            Arc::clone(registry),
            Arc::new(AppConfig::default()),
            Arc::new(FixedClock("00:00:00".into())),
            handle.clone(),
        )
    }

    #[test]
    fn test_disconnect_removes_only_own_entry() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (alice, _rx_a) = join(&registry, "alice");
        let (bob, _rx_b) = join(&registry, "bob");

        let outcome = context(&registry, &alice).handle_disconnect(&CloseReason::Eof);
        assert_eq!(outcome, DisconnectOutcome::Removed { siblings: 0 });
        assert_eq!(registry.all(), vec![(bob.id(), "bob".to_string())]);
        assert!(!bob.is_closed());
    }

    #[test]
    fn test_disconnect_closes_siblings() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (primary, _rx_p) = join(&registry, "alice");
        let (helper, _rx_h) = join(&registry, "alice");
        let (bob, _rx_b) = join(&registry, "bob");

        let outcome = context(&registry, &primary).handle_disconnect(&CloseReason::Eof);
        assert_eq!(outcome, DisconnectOutcome::Removed { siblings: 1 });
        assert!(helper.is_closed());
        assert!(!bob.is_closed());
        assert_eq!(registry.connections_named("alice"), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disconnect_when_already_removed() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (primary, _rx_p) = join(&registry, "alice");
        let (helper, _rx_h) = join(&registry, "alice");

        context(&registry, &primary).handle_disconnect(&CloseReason::Eof);
        let outcome = context(&registry, &helper).handle_disconnect(&CloseReason::Forced);
        assert_eq!(outcome, DisconnectOutcome::AlreadyGone);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_disconnect_with_read_errors() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (alice, _rx_a) = join(&registry, "alice");
        let (bob, _rx_b) = join(&registry, "bob");

        let reset = std::io::Error::new(ErrorKind::ConnectionReset, "reset by peer");
        let outcome = context(&registry, &alice).handle_disconnect(&CloseReason::Error(reset));
        assert_eq!(outcome, DisconnectOutcome::Removed { siblings: 0 });

        let other = std::io::Error::new(ErrorKind::InvalidData, "garbage");
        let outcome = context(&registry, &bob).handle_disconnect(&CloseReason::Error(other));
        assert_eq!(outcome, DisconnectOutcome::Removed { siblings: 0 });
        assert!(registry.is_empty());
    }
}
