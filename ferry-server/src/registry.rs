//! Connection Registry
//!
//! Tracks live connections by display name. Every handler task registers,
//! looks up and removes entries here concurrently; all access goes through
//! a single mutex that is never held across an `.await` or re-entered.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Live connections allowed per display name: the chat connection plus one
/// file-forwarding helper
pub const MAX_CONNECTIONS_PER_NAME: usize = 2;

/// Unique connection identifier, increasing in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a ConnectionId from a raw value (mainly for testing)
    #[cfg(test)]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[cfg(test)]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Conn({})", self.0)
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{name} already holds {} connections", MAX_CONNECTIONS_PER_NAME)]
    NameLimitReached { name: String },
}

/// Outbound queue of a connection is gone (its writer has stopped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is no longer writable")]
pub struct ConnectionGone(pub ConnectionId);

/// Non-owning handle to a registered connection
///
/// The handler task owns the socket; this handle only reaches its outbound
/// queue and its close token.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    name: String,
    outbound: mpsc::Sender<Bytes>,
    close: CancellationToken,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue bytes for the connection's writer, waiting if the queue is full
    pub async fn send(&self, data: Bytes) -> Result<(), ConnectionGone> {
        self.outbound
            .send(data)
            .await
            .map_err(|_| ConnectionGone(self.id))
    }

    /// Ask the owning handler to close the connection
    pub fn close(&self) {
        self.close.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called
    pub async fn closed(&self) {
        self.close.cancelled().await
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Entries removed by [`ConnectionRegistry::remove_with_siblings`]
#[derive(Debug)]
pub struct Removal {
    pub name: String,
    /// Other connections that were registered under the same name
    pub siblings: Vec<ConnectionHandle>,
}

/// Registry of all live connections
pub struct ConnectionRegistry {
    /// Ordered by id, so iteration follows registration order
    connections: Mutex<BTreeMap<ConnectionId, ConnectionHandle>>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection under `name`
    ///
    /// Fails once `name` already holds [`MAX_CONNECTIONS_PER_NAME`] live
    /// connections.
    pub fn register(
        &self,
        name: &str,
        outbound: mpsc::Sender<Bytes>,
        close: CancellationToken,
    ) -> Result<ConnectionHandle, RegistryError> {
        let mut connections = self.connections.lock();

        if holders(&connections, name) >= MAX_CONNECTIONS_PER_NAME {
            return Err(RegistryError::NameLimitReached {
                name: name.to_string(),
            });
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let handle = ConnectionHandle {
            id,
            name: name.to_string(),
            outbound,
            close,
        };
        connections.insert(id, handle.clone());
        debug!("Registered {} as {}", id, name);

        Ok(handle)
    }

    /// Remove a connection, returning the name it was registered under
    #[cfg(test)]
    pub fn unregister(&self, id: ConnectionId) -> Option<String> {
        let removed = self.connections.lock().remove(&id)?;
        debug!("Unregistered {} ({})", id, removed.name);
        Some(removed.name)
    }

    /// Remove a connection and every other connection sharing its name
    ///
    /// Returns `None` if `id` was no longer registered, in which case
    /// nothing is removed.
    pub fn remove_with_siblings(&self, id: ConnectionId) -> Option<Removal> {
        let mut connections = self.connections.lock();
        let removed = connections.remove(&id)?;

        let sibling_ids: Vec<ConnectionId> = connections
            .values()
            .filter(|c| c.name == removed.name)
            .map(|c| c.id)
            .collect();
        let siblings = sibling_ids
            .into_iter()
            .filter_map(|sibling| connections.remove(&sibling))
            .collect();

        Some(Removal {
            name: removed.name,
            siblings,
        })
    }

    /// Resolve a display name to its earliest-registered live connection
    pub fn find_by_name(&self, name: &str) -> Option<ConnectionHandle> {
        self.connections
            .lock()
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Every connection other than `id`, in registration order
    pub fn peers_except(&self, id: ConnectionId) -> Vec<ConnectionHandle> {
        self.connections
            .lock()
            .values()
            .filter(|c| c.id != id)
            .cloned()
            .collect()
    }

    /// Snapshot of every `(connection, name)` pair, in registration order
    pub fn all(&self) -> Vec<(ConnectionId, String)> {
        self.connections
            .lock()
            .values()
            .map(|c| (c.id, c.name.clone()))
            .collect()
    }

    #[cfg(test)]
    pub fn name_of(&self, id: ConnectionId) -> Option<String> {
        self.connections.lock().get(&id).map(|c| c.name.clone())
    }

    #[cfg(test)]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(&id)
    }

    /// Number of live connections registered under `name`
    #[cfg(test)]
    pub fn connections_named(&self, name: &str) -> usize {
        holders(&self.connections.lock(), name)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

fn holders(connections: &BTreeMap<ConnectionId, ConnectionHandle>, name: &str) -> usize {
    connections.values().filter(|c| c.name == name).count()
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.len())
            .finish()
    }
}
