//! Participant actions and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a submitted action.
///
/// Transitions are monotonic: `Pending → InFlight → Resolved`, with the one
/// sanctioned exception that a stuck `InFlight` action may be explicitly
/// released back to `Pending` for redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    /// Admitted to the queue, waiting for the decision engine.
    Pending,
    /// Currently held by the decision engine. At most one action across the
    /// whole queue is in this state.
    InFlight,
    /// Resolved by the engine; an outcome is stored.
    Resolved,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "pending"),
            ActionStatus::InFlight => write!(f, "in_flight"),
            ActionStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A unit of participant input, retained for the session lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique action identifier.
    pub id: Uuid,
    /// Monotonic admission sequence; defines queue order.
    pub sequence: u64,
    /// Key of the submitting identity.
    pub identity: Uuid,
    /// Opaque payload text forwarded to the decision engine.
    pub payload: String,
    /// Timestamp of admission into the queue.
    pub submitted_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: ActionStatus,
    /// Whether this action sat in a turn-gate holding buffer before
    /// admission.
    pub deferred: bool,
}
