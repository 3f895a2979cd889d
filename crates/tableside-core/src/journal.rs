//! Durable action-journal abstraction.
//!
//! Every queue state transition is appended to a journal so a process
//! restart can reconstruct in-flight and historical state. The on-disk
//! encoding belongs to the implementing crate, not to this contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;
use crate::error::RelayError;
use crate::outcome::Outcome;

/// One appended queue transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalRecord {
    /// An action was admitted to the queue.
    Submitted {
        /// The admitted action (status `Pending`).
        action: Action,
    },
    /// An action was taken by the decision engine.
    Taken {
        /// The action taken in flight.
        action_id: Uuid,
        /// When it was taken.
        at: DateTime<Utc>,
    },
    /// An action was resolved with an outcome.
    Resolved {
        /// The resolved action.
        action_id: Uuid,
        /// The engine's outcome.
        outcome: Outcome,
        /// When it was resolved.
        at: DateTime<Utc>,
    },
}

/// Append-only journal of queue transitions.
#[async_trait]
pub trait ActionJournal: Send + Sync {
    /// Appends one record. Must be durable before returning.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` if the record could not be persisted.
    async fn append(&self, record: &JournalRecord) -> Result<(), RelayError>;

    /// Loads every record in append order, for replay after a restart.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` if the journal could not be read.
    async fn load_all(&self) -> Result<Vec<JournalRecord>, RelayError>;
}
