//! Participant identities and roles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an identity holds for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Runs the session; sees host-only annotations and drives administration.
    Host,
    /// A player seat; owns an in-game entity and may submit actions.
    Participant,
    /// Read-only; receives public content only and may not submit.
    Observer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Participant => write!(f, "participant"),
            Role::Observer => write!(f, "observer"),
        }
    }
}

/// A session-scoped participant identity, distinct from any live connection.
///
/// Identities are created when the session opens or when a participant is
/// admitted, are immutable for the session lifetime, and outlive any number
/// of connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Stable participant key.
    pub key: Uuid,
    /// Display label shown to other participants.
    pub label: String,
    /// Role held for the session lifetime.
    pub role: Role,
    /// The in-game entity this identity controls (`None` for Observer).
    pub owned_entity: Option<Uuid>,
}
