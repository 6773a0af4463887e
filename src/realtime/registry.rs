//! Live connection registry and notification fan-out
//!
//! Holds every open WebSocket connection in two indexes: a global map keyed
//! by connection id and a per-identity map grouping the connections of one
//! logical subscriber (a user may have several tabs/devices open). Both
//! indexes live behind a single `RwLock` so register/unregister are always
//! serialized against broadcast iteration.
//!
//! Delivery is fire-and-forget: a failed write marks the connection dead and
//! removes it, and never propagates to the caller or blocks delivery to the
//! remaining connections.

use std::collections::{HashMap, HashSet};

use axum::extract::ws::Message;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::envelope::WsEnvelope;

/// Identity shared by all clients that connect without a user id.
pub const ANONYMOUS_IDENTITY: &str = "default";

/// Outbound frames queued per connection before new ones are dropped.
///
/// Bounding the queue keeps a slow-but-alive client from growing memory
/// for the life of its connection; dropping on overflow stays within the
/// at-most-once delivery contract.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub type ConnectionId = Uuid;

/// Sending half of one live client connection.
///
/// The receiving half is drained by that connection's writer task; a closed
/// channel is the signal that the connection is dead.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ConnectionId,
    pub identity: String,
    tx: mpsc::Sender<Message>,
}

impl ClientHandle {
    pub fn new(identity: impl Into<String>, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            tx,
        }
    }

    fn send_text(&self, text: String) -> Result<(), SendError> {
        self.tx
            .try_send(Message::Text(text.into()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SendError::ConnectionClosed,
            })
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("outbound queue full")]
    QueueFull,
}

#[derive(Default)]
struct Indexes {
    /// Every open connection, keyed by connection id
    connections: HashMap<ConnectionId, ClientHandle>,
    /// Connection ids grouped by subscriber identity
    identities: HashMap<String, HashSet<ConnectionId>>,
}

/// Registry of live WebSocket connections.
///
/// Constructed once at startup and shared through [`AppState`]; state is
/// process-local and lost on restart (reconnecting clients re-register).
///
/// [`AppState`]: crate::server::state::AppState
pub struct ConnectionRegistry {
    inner: RwLock<Indexes>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Indexes::default()),
        }
    }

    /// Add a connection under its subscriber identity.
    ///
    /// Registering an id that is already present is an idempotent no-op;
    /// the existing entry wins.
    pub async fn register(&self, handle: ClientHandle) {
        let mut indexes = self.inner.write().await;
        if indexes.connections.contains_key(&handle.id) {
            log::debug!("Connection {} already registered", handle.id);
            return;
        }

        indexes
            .identities
            .entry(handle.identity.clone())
            .or_default()
            .insert(handle.id);
        let identity = handle.identity.clone();
        indexes.connections.insert(handle.id, handle);

        log::info!(
            "WebSocket connected: {} (Total: {})",
            identity,
            indexes.connections.len()
        );
    }

    /// Remove a connection from both indexes.
    ///
    /// Idempotent: unregistering an absent connection is a no-op, so a
    /// duplicate disconnect signal is harmless. The identity entry is
    /// removed entirely once its last connection goes away.
    pub async fn unregister(&self, id: ConnectionId, identity: &str) {
        let mut indexes = self.inner.write().await;
        if indexes.connections.remove(&id).is_none() {
            return;
        }

        if let Some(ids) = indexes.identities.get_mut(identity) {
            ids.remove(&id);
            if ids.is_empty() {
                indexes.identities.remove(identity);
            }
        }

        log::info!(
            "WebSocket disconnected: {} (Total: {})",
            identity,
            indexes.connections.len()
        );
    }

    /// Serialize an envelope and write it to one connection.
    ///
    /// Returns whether delivery was handed to the connection's writer. A
    /// dead connection is pruned here rather than surfaced as an error.
    pub async fn send_to_connection(&self, id: ConnectionId, envelope: &WsEnvelope) -> bool {
        match serde_json::to_string(envelope) {
            Ok(payload) => self.send_raw_to_connection(id, payload).await,
            Err(e) => {
                log::warn!("Failed to serialize envelope: {}", e);
                false
            }
        }
    }

    /// Write a pre-serialized text frame to one connection (used for the
    /// verbatim echo of unrecognized client messages).
    pub async fn send_raw_to_connection(&self, id: ConnectionId, payload: String) -> bool {
        let dead = {
            let indexes = self.inner.read().await;
            match indexes.connections.get(&id) {
                Some(handle) => match handle.send_text(payload) {
                    Ok(()) => None,
                    Err(SendError::QueueFull) => {
                        log::warn!("Dropping frame for slow connection {}", id);
                        return false;
                    }
                    Err(SendError::ConnectionClosed) => Some((id, handle.identity.clone())),
                },
                None => return false,
            }
        };

        if let Some((id, identity)) = dead {
            self.unregister(id, &identity).await;
            return false;
        }
        true
    }

    /// Deliver an envelope to every connection of one subscriber identity.
    ///
    /// Each connection is attempted independently; a dead connection never
    /// blocks or skips delivery to its siblings. An offline identity is a
    /// silent no-op. Returns the number of successful writes.
    pub async fn send_to_identity(&self, identity: &str, envelope: &WsEnvelope) -> usize {
        let payload = match serde_json::to_string(envelope) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Failed to serialize envelope: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let indexes = self.inner.read().await;
            let Some(ids) = indexes.identities.get(identity) else {
                return 0;
            };
            for id in ids {
                if let Some(handle) = indexes.connections.get(id) {
                    match handle.send_text(payload.clone()) {
                        Ok(()) => delivered += 1,
                        Err(SendError::QueueFull) => {
                            log::warn!("Dropping frame for slow connection {}", id);
                        }
                        Err(SendError::ConnectionClosed) => {
                            dead.push((*id, handle.identity.clone()));
                        }
                    }
                }
            }
        }

        self.prune(dead).await;
        delivered
    }

    /// Deliver an envelope to every open connection.
    ///
    /// Same per-connection failure isolation as [`send_to_identity`].
    ///
    /// [`send_to_identity`]: ConnectionRegistry::send_to_identity
    pub async fn broadcast(&self, envelope: &WsEnvelope) -> usize {
        let payload = match serde_json::to_string(envelope) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Failed to serialize envelope: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let indexes = self.inner.read().await;
            for handle in indexes.connections.values() {
                match handle.send_text(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(SendError::QueueFull) => {
                        log::warn!("Dropping frame for slow connection {}", handle.id);
                    }
                    Err(SendError::ConnectionClosed) => {
                        dead.push((handle.id, handle.identity.clone()));
                    }
                }
            }
        }

        self.prune(dead).await;
        delivered
    }

    /// Number of currently open connections.
    pub async fn active_connections(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Number of open connections for one identity.
    pub async fn identity_connections(&self, identity: &str) -> usize {
        self.inner
            .read()
            .await
            .identities
            .get(identity)
            .map_or(0, HashSet::len)
    }

    async fn prune(&self, dead: Vec<(ConnectionId, String)>) {
        for (id, identity) in dead {
            log::debug!("Pruning dead connection {} ({})", id, identity);
            self.unregister(id, &identity).await;
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connect(identity: &str) -> (ClientHandle, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientHandle::new(identity, tx), rx)
    }

    fn recv_kind(rx: &mut mpsc::Receiver<Message>) -> Option<String> {
        match rx.try_recv() {
            Ok(Message::Text(text)) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                Some(value["type"].as_str().unwrap().to_string())
            }
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_register_unregister_counts() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = connect("u1");
        let (b, _rx_b) = connect("u1");

        registry.register(a.clone()).await;
        registry.register(b.clone()).await;
        assert_eq!(registry.active_connections().await, 2);
        assert_eq!(registry.identity_connections("u1").await, 2);

        registry.unregister(a.id, "u1").await;
        assert_eq!(registry.active_connections().await, 1);
        assert_eq!(registry.identity_connections("u1").await, 1);

        // Duplicate unregister is a no-op
        registry.unregister(a.id, "u1").await;
        assert_eq!(registry.active_connections().await, 1);
    }

    #[tokio::test]
    async fn test_double_register_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = connect("u1");

        registry.register(a.clone()).await;
        registry.register(a.clone()).await;
        assert_eq!(registry.active_connections().await, 1);
        assert_eq!(registry.identity_connections("u1").await, 1);

        registry.unregister(a.id, "u1").await;
        assert_eq!(registry.active_connections().await, 0);
    }

    #[tokio::test]
    async fn test_identity_entry_removed_when_emptied() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = connect("u1");

        registry.register(a.clone()).await;
        registry.unregister(a.id, "u1").await;

        // The identity key must be gone, not present with an empty set
        let indexes = registry.inner.read().await;
        assert!(!indexes.identities.contains_key("u1"));
    }

    #[tokio::test]
    async fn test_send_to_identity_with_no_connections_is_noop() {
        let registry = ConnectionRegistry::new();
        let delivered = registry
            .send_to_identity("offline", &WsEnvelope::new("new_finding", json!({})))
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_broadcast_survives_dead_connection() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = connect("u1");
        let (b, rx_b) = connect("u1");
        let (c, mut rx_c) = connect("u2");

        registry.register(a).await;
        registry.register(b.clone()).await;
        registry.register(c).await;

        // Kill b's writer side
        drop(rx_b);

        let delivered = registry
            .broadcast(&WsEnvelope::new("trend_alert", json!({ "trend": "ai" })))
            .await;

        assert_eq!(delivered, 2);
        assert_eq!(recv_kind(&mut rx_a).as_deref(), Some("trend_alert"));
        assert_eq!(recv_kind(&mut rx_c).as_deref(), Some("trend_alert"));

        // The dead connection was pruned from both indexes
        assert_eq!(registry.active_connections().await, 2);
        assert_eq!(registry.identity_connections("u1").await, 1);
    }

    #[tokio::test]
    async fn test_send_to_connection_prunes_dead_handle() {
        let registry = ConnectionRegistry::new();
        let (a, rx_a) = connect("u1");
        let id = a.id;
        registry.register(a).await;
        drop(rx_a);

        let ok = registry
            .send_to_connection(id, &WsEnvelope::pong())
            .await;
        assert!(!ok);
        assert_eq!(registry.active_connections().await, 0);
        assert_eq!(registry.identity_connections("u1").await, 0);
    }

    #[tokio::test]
    async fn test_slow_connection_drops_frames_but_stays_registered() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(2);
        let handle = ClientHandle::new("u1", tx);
        registry.register(handle).await;

        let envelope = WsEnvelope::new("trend_alert", json!({}));
        assert_eq!(registry.broadcast(&envelope).await, 1);
        assert_eq!(registry.broadcast(&envelope).await, 1);

        // Queue is full: the frame is dropped, the connection is not pruned
        assert_eq!(registry.broadcast(&envelope).await, 0);
        assert_eq!(registry.active_connections().await, 1);

        // Once the writer drains, delivery resumes
        assert!(recv_kind(&mut rx).is_some());
        assert!(recv_kind(&mut rx).is_some());
        assert_eq!(registry.broadcast(&envelope).await, 1);
    }

    #[tokio::test]
    async fn test_identity_and_broadcast_routing() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = connect("u1");
        let (b, mut rx_b) = connect("u1");
        let (c, mut rx_c) = connect("u2");
        let a_id = a.id;

        registry.register(a).await;
        registry.register(b).await;
        registry.register(c).await;

        let envelope = WsEnvelope::new("new_finding", json!({ "competitor": "Acme" }));
        assert_eq!(registry.send_to_identity("u1", &envelope).await, 2);
        assert_eq!(recv_kind(&mut rx_a).as_deref(), Some("new_finding"));
        assert_eq!(recv_kind(&mut rx_b).as_deref(), Some("new_finding"));
        assert_eq!(recv_kind(&mut rx_c), None);

        assert_eq!(registry.broadcast(&envelope).await, 3);
        assert_eq!(recv_kind(&mut rx_a).as_deref(), Some("new_finding"));
        assert_eq!(recv_kind(&mut rx_b).as_deref(), Some("new_finding"));
        assert_eq!(recv_kind(&mut rx_c).as_deref(), Some("new_finding"));

        // After A disconnects, only B still receives for "u1"
        registry.unregister(a_id, "u1").await;
        assert_eq!(registry.send_to_identity("u1", &envelope).await, 1);
        assert_eq!(recv_kind(&mut rx_a), None);
        assert_eq!(recv_kind(&mut rx_b).as_deref(), Some("new_finding"));
    }
}
