//! Live connection tracking and fan-out.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use tableside_core::clock::Clock;
use tableside_core::error::RelayError;

use crate::frames::OutboundFrame;

/// Report of a connection past its heartbeat window. The connection is
/// flagged, not closed: forced disconnection is a Host decision.
#[derive(Debug, Clone, Copy)]
pub struct StaleConnection {
    /// The stale connection.
    pub connection_id: Uuid,
    /// Its owning identity.
    pub identity: Uuid,
    /// The last heartbeat seen.
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug)]
struct ConnectionEntry {
    identity: Uuid,
    last_seen: DateTime<Utc>,
    stale: bool,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

/// Tracks every live transport endpoint for the session. An identity may
/// hold any number of simultaneous connections; delivery to an identity
/// goes to all of them. The connection set has its own lock, never shared
/// with the queue.
pub struct ConnectionHub {
    clock: Arc<dyn Clock>,
    inner: RwLock<HashMap<Uuid, ConnectionEntry>>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection for `identity` and returns its id. Frames
    /// pushed to the returned sender's paired receiver are the connection's
    /// outbound stream.
    pub fn register(&self, identity: Uuid, sender: mpsc::UnboundedSender<OutboundFrame>) -> Uuid {
        let connection_id = Uuid::new_v4();
        let mut connections = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        connections.insert(
            connection_id,
            ConnectionEntry {
                identity,
                last_seen: self.clock.now(),
                stale: false,
                sender,
            },
        );
        tracing::info!(%connection_id, %identity, "connection registered");
        connection_id
    }

    /// Removes a connection. Returns whether it existed. Dropping the
    /// stored sender ends the paired receiver's stream.
    pub fn unregister(&self, connection_id: Uuid) -> bool {
        let mut connections = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = connections.remove(&connection_id).is_some();
        if removed {
            tracing::info!(%connection_id, "connection unregistered");
        }
        removed
    }

    /// Records a heartbeat, clearing any stale flag.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownConnection` for unknown ids.
    pub fn heartbeat(&self, connection_id: Uuid) -> Result<(), RelayError> {
        let mut connections = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = connections
            .get_mut(&connection_id)
            .ok_or(RelayError::UnknownConnection(connection_id))?;
        entry.last_seen = self.clock.now();
        entry.stale = false;
        Ok(())
    }

    /// Fans out per-identity frames: `frame_for` is called once per
    /// connected identity, and its frame (if any) is delivered to every
    /// one of that identity's connections. Connections whose receiver has
    /// gone away are pruned. Returns the number of frames delivered.
    pub fn broadcast_with(&self, mut frame_for: impl FnMut(Uuid) -> Option<OutboundFrame>) -> usize {
        let targets: Vec<(Uuid, Uuid, mpsc::UnboundedSender<OutboundFrame>)> = {
            let connections = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            connections
                .iter()
                .map(|(id, entry)| (*id, entry.identity, entry.sender.clone()))
                .collect()
        };

        let mut frames: HashMap<Uuid, Option<OutboundFrame>> = HashMap::new();
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (connection_id, identity, sender) in targets {
            let frame = frames
                .entry(identity)
                .or_insert_with(|| frame_for(identity));
            if let Some(frame) = frame {
                if sender.send(frame.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(connection_id);
                }
            }
        }

        if !dead.is_empty() {
            let mut connections = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            for connection_id in dead {
                connections.remove(&connection_id);
                tracing::debug!(%connection_id, "pruned closed connection");
            }
        }
        delivered
    }

    /// Delivers a frame to every connection of one identity. Returns the
    /// number of connections reached.
    pub fn send_to_identity(&self, identity: Uuid, frame: &OutboundFrame) -> usize {
        self.broadcast_with(|candidate| (candidate == identity).then(|| frame.clone()))
    }

    /// Delivers a frame to one specific connection.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownConnection` if the connection does not
    /// exist or its receiver has gone away.
    pub fn send_to_connection(
        &self,
        connection_id: Uuid,
        frame: OutboundFrame,
    ) -> Result<(), RelayError> {
        let connections = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entry = connections
            .get(&connection_id)
            .ok_or(RelayError::UnknownConnection(connection_id))?;
        entry
            .sender
            .send(frame)
            .map_err(|_| RelayError::UnknownConnection(connection_id))
    }

    /// Flags connections whose last heartbeat is older than `timeout` and
    /// returns the newly flagged ones. Already-flagged connections are not
    /// re-reported; a later heartbeat clears the flag.
    pub fn mark_stale(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<StaleConnection> {
        let mut connections = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut reports = Vec::new();
        for (connection_id, entry) in connections.iter_mut() {
            if !entry.stale && now - entry.last_seen > timeout {
                entry.stale = true;
                reports.push(StaleConnection {
                    connection_id: *connection_id,
                    identity: entry.identity,
                    last_seen: entry.last_seen,
                });
                tracing::warn!(%connection_id, identity = %entry.identity, "connection marked stale");
            }
        }
        reports
    }

    /// Whether `identity` has at least one connection that is not stale.
    #[must_use]
    pub fn has_live_connection(&self, identity: Uuid) -> bool {
        let connections = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        connections
            .values()
            .any(|entry| entry.identity == identity && !entry.stale)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
