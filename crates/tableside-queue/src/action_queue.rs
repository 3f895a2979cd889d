//! The ordered, durable, single-in-flight action queue.
//!
//! Submission order is preserved end to end: the journal is appended while
//! the queue lock is held, so journal order, admission sequence, and
//! `take_next` order are all the same order. The at-most-one-InFlight
//! invariant is what lets the external decision engine stay single-threaded
//! in its world-state effects.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use tableside_core::action::{Action, ActionStatus};
use tableside_core::clock::Clock;
use tableside_core::error::RelayError;
use tableside_core::journal::{ActionJournal, JournalRecord};
use tableside_core::outcome::Outcome;

/// Receipt for a successfully admitted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedAction {
    /// The admitted action's id.
    pub action_id: Uuid,
    /// 1-based position among pending actions at admission time.
    pub position: usize,
}

/// Report of an InFlight action exceeding the stuck-action ceiling.
#[derive(Debug, Clone, Copy)]
pub struct StuckAction {
    /// The stuck action.
    pub action_id: Uuid,
    /// Its submitting identity.
    pub identity: Uuid,
    /// When the engine took it.
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    action_id: Uuid,
    taken_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Append-only record of every admitted action, in admission order.
    actions: Vec<Action>,
    /// Action id to index in `actions`.
    index: HashMap<Uuid, usize>,
    /// One stored outcome per resolved action.
    outcomes: HashMap<Uuid, Outcome>,
    /// The single action currently held by the engine, if any.
    in_flight: Option<InFlight>,
    /// Next admission sequence.
    next_sequence: u64,
    /// Set when the append-order invariant is found violated; the queue
    /// then refuses all further work.
    poisoned: bool,
}

impl QueueState {
    fn pending_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.status == ActionStatus::Pending)
            .count()
    }

    fn first_pending(&self) -> Option<usize> {
        self.actions
            .iter()
            .position(|a| a.status == ActionStatus::Pending)
    }

    fn lookup(&self, action_id: Uuid) -> Result<usize, RelayError> {
        self.index
            .get(&action_id)
            .copied()
            .ok_or(RelayError::UnknownAction(action_id))
    }
}

/// Strictly FIFO, journalled work queue with an at-most-one-InFlight
/// invariant enforced against the single external decision consumer.
pub struct ActionQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    journal: Arc<dyn ActionJournal>,
    clock: Arc<dyn Clock>,
}

impl ActionQueue {
    /// Creates an empty queue backed by the given journal.
    #[must_use]
    pub fn new(journal: Arc<dyn ActionJournal>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            journal,
            clock,
        }
    }

    /// Reconstructs a queue from its journal. Any action left InFlight at
    /// crash time returns to Pending for at-least-once redelivery; resolved
    /// actions keep their stored outcomes.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` if the journal cannot be read, or
    /// `RelayError::OrderingViolated` if the journalled admission sequences
    /// are not strictly increasing.
    pub async fn recover(
        journal: Arc<dyn ActionJournal>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RelayError> {
        let records = journal.load_all().await?;
        let mut state = QueueState::default();

        for record in records {
            match record {
                JournalRecord::Submitted { action } => {
                    if action.sequence < state.next_sequence {
                        return Err(RelayError::OrderingViolated(format!(
                            "journal sequence {} after {}",
                            action.sequence, state.next_sequence
                        )));
                    }
                    state.next_sequence = action.sequence + 1;
                    state.index.insert(action.id, state.actions.len());
                    state.actions.push(Action {
                        status: ActionStatus::Pending,
                        ..action
                    });
                }
                JournalRecord::Taken { action_id, at } => {
                    let idx = state.lookup(action_id)?;
                    state.actions[idx].status = ActionStatus::InFlight;
                    state.in_flight = Some(InFlight { action_id, taken_at: at });
                }
                JournalRecord::Resolved {
                    action_id, outcome, ..
                } => {
                    let idx = state.lookup(action_id)?;
                    state.actions[idx].status = ActionStatus::Resolved;
                    state.outcomes.insert(action_id, outcome);
                    state.in_flight = None;
                }
            }
        }

        // At-least-once redelivery: whatever was InFlight when the process
        // stopped goes back to Pending.
        if let Some(in_flight) = state.in_flight.take() {
            let idx = state.lookup(in_flight.action_id)?;
            state.actions[idx].status = ActionStatus::Pending;
            tracing::warn!(
                action_id = %in_flight.action_id,
                "recovered in-flight action returned to pending"
            );
        }

        tracing::info!(
            actions = state.actions.len(),
            pending = state.pending_count(),
            "queue recovered from journal"
        );

        Ok(Self {
            state: Mutex::new(state),
            notify: Notify::new(),
            journal,
            clock,
        })
    }

    /// Admits an action at the tail of the queue and journals it durably
    /// before acknowledging. Never blocks on the decision engine; blocks
    /// only on the queue lock.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` if the record could not be persisted
    /// (the action is then not admitted), or `RelayError::OrderingViolated`
    /// if the queue has been poisoned.
    pub async fn submit(
        &self,
        identity: Uuid,
        payload: String,
        deferred: bool,
    ) -> Result<SubmittedAction, RelayError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(RelayError::OrderingViolated("queue is poisoned".into()));
        }

        let action = Action {
            id: Uuid::new_v4(),
            sequence: state.next_sequence,
            identity,
            payload,
            submitted_at: self.clock.now(),
            status: ActionStatus::Pending,
            deferred,
        };

        // Append while holding the lock so journal order equals admission
        // order. A failed append means the action was never admitted.
        self.journal
            .append(&JournalRecord::Submitted {
                action: action.clone(),
            })
            .await?;

        let last_sequence = state.actions.last().map(|last| last.sequence);
        if let Some(last_sequence) = last_sequence {
            if last_sequence >= action.sequence {
                state.poisoned = true;
                return Err(RelayError::OrderingViolated(format!(
                    "sequence {} not after {last_sequence}",
                    action.sequence
                )));
            }
        }

        state.next_sequence += 1;
        let slot = state.actions.len();
        state.index.insert(action.id, slot);
        state.actions.push(action.clone());
        let position = state.pending_count();
        drop(state);

        tracing::debug!(action_id = %action.id, sequence = action.sequence, position, "action admitted");
        self.notify.notify_one();

        Ok(SubmittedAction {
            action_id: action.id,
            position,
        })
    }

    /// Takes the oldest pending action, marking it InFlight, waiting
    /// (without busy-spinning) while the queue is empty or another action
    /// is already in flight.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` if the transition could not be
    /// journalled, or `RelayError::OrderingViolated` on a poisoned queue.
    pub async fn take_next(&self) -> Result<Action, RelayError> {
        loop {
            // Register interest before checking state so a notification
            // between the check and the await is not lost.
            let notified = self.notify.notified();

            if let Some(action) = self.try_take_next().await? {
                return Ok(action);
            }

            notified.await;
        }
    }

    /// Non-blocking variant of [`take_next`](Self::take_next): returns
    /// `None` when no action is pending or one is already in flight.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`take_next`](Self::take_next).
    pub async fn try_take_next(&self) -> Result<Option<Action>, RelayError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(RelayError::OrderingViolated("queue is poisoned".into()));
        }
        if state.in_flight.is_some() {
            return Ok(None);
        }
        let Some(idx) = state.first_pending() else {
            return Ok(None);
        };

        let action_id = state.actions[idx].id;
        let taken_at = self.clock.now();
        self.journal
            .append(&JournalRecord::Taken { action_id, at: taken_at })
            .await?;

        state.actions[idx].status = ActionStatus::InFlight;
        state.in_flight = Some(InFlight { action_id, taken_at });
        let action = state.actions[idx].clone();
        drop(state);

        tracing::debug!(%action_id, "action taken in flight");
        Ok(Some(action))
    }

    /// Resolves the current InFlight action with its outcome and wakes the
    /// consumer for the next pending action.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownAction` for an unknown id,
    /// `RelayError::InvalidTransition` if the action is not the current
    /// InFlight action, or `RelayError::Journal` on persistence failure.
    pub async fn resolve(&self, action_id: Uuid, outcome: Outcome) -> Result<(), RelayError> {
        // The outcome is keyed by the action being resolved regardless of
        // what the producer stamped on it.
        let outcome = Outcome {
            action_id,
            ..outcome
        };

        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(RelayError::OrderingViolated("queue is poisoned".into()));
        }
        let idx = state.lookup(action_id)?;
        let in_flight_matches = state
            .in_flight
            .is_some_and(|in_flight| in_flight.action_id == action_id);
        if !in_flight_matches {
            return Err(RelayError::InvalidTransition {
                action_id,
                from: state.actions[idx].status,
                attempted: ActionStatus::Resolved,
            });
        }

        let resolved_at = self.clock.now();
        self.journal
            .append(&JournalRecord::Resolved {
                action_id,
                outcome: outcome.clone(),
                at: resolved_at,
            })
            .await?;

        state.actions[idx].status = ActionStatus::Resolved;
        state.outcomes.insert(action_id, outcome);
        state.in_flight = None;
        drop(state);

        tracing::debug!(%action_id, "action resolved");
        self.notify.notify_one();
        Ok(())
    }

    /// Returns a stuck InFlight action past the given ceiling, if any.
    /// Reporting only: the action stays InFlight until an explicit
    /// [`release_in_flight`](Self::release_in_flight).
    pub async fn stuck_in_flight(&self, now: DateTime<Utc>, ceiling: Duration) -> Option<StuckAction> {
        let state = self.state.lock().await;
        let in_flight = state.in_flight?;
        if now - in_flight.taken_at <= ceiling {
            return None;
        }
        let idx = *state.index.get(&in_flight.action_id)?;
        Some(StuckAction {
            action_id: in_flight.action_id,
            identity: state.actions[idx].identity,
            taken_at: in_flight.taken_at,
        })
    }

    /// Explicit operator action: returns the current InFlight action to
    /// Pending for redelivery.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownAction` for an unknown id or
    /// `RelayError::InvalidTransition` if the action is not InFlight.
    pub async fn release_in_flight(&self, action_id: Uuid) -> Result<(), RelayError> {
        let mut state = self.state.lock().await;
        let idx = state.lookup(action_id)?;
        let in_flight_matches = state
            .in_flight
            .is_some_and(|in_flight| in_flight.action_id == action_id);
        if !in_flight_matches {
            return Err(RelayError::InvalidTransition {
                action_id,
                from: state.actions[idx].status,
                attempted: ActionStatus::Pending,
            });
        }

        state.actions[idx].status = ActionStatus::Pending;
        state.in_flight = None;
        drop(state);

        tracing::warn!(%action_id, "in-flight action released back to pending");
        self.notify.notify_one();
        Ok(())
    }

    /// Number of actions currently pending.
    pub async fn count_pending(&self) -> usize {
        self.state.lock().await.pending_count()
    }

    /// 1-based position of a pending action among pending actions, or
    /// `None` if the action is not pending.
    pub async fn position_of(&self, action_id: Uuid) -> Option<usize> {
        let state = self.state.lock().await;
        let idx = *state.index.get(&action_id)?;
        if state.actions[idx].status != ActionStatus::Pending {
            return None;
        }
        Some(
            state.actions[..=idx]
                .iter()
                .filter(|a| a.status == ActionStatus::Pending)
                .count(),
        )
    }

    /// Returns a snapshot of the action with the given id.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownAction` for an unknown id.
    pub async fn action(&self, action_id: Uuid) -> Result<Action, RelayError> {
        let state = self.state.lock().await;
        let idx = state.lookup(action_id)?;
        Ok(state.actions[idx].clone())
    }

    /// Returns the stored outcome for a resolved action, if any.
    pub async fn outcome_of(&self, action_id: Uuid) -> Option<Outcome> {
        self.state.lock().await.outcomes.get(&action_id).cloned()
    }

    /// Returns the full admission-ordered action history (audit/replay).
    pub async fn history(&self) -> Vec<Action> {
        self.state.lock().await.actions.clone()
    }
}
