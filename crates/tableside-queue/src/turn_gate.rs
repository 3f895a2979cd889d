//! Turn-ordered admission gating for structured encounters.
//!
//! During a Sequential phase only the active identity's submissions are
//! admitted directly; anything else sits in a bounded per-identity FIFO
//! holding buffer until that identity's turn comes up. The gate only
//! decides and holds; actually promoting held submissions into the action
//! queue belongs to the relay.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use tableside_core::clock::Clock;
use tableside_core::error::RelayError;
pub use tableside_core::turn::TurnMode;

/// The gate's verdict on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admissibility {
    /// Admit directly into the action queue.
    Admit,
    /// Hold in the submitter's buffer until their turn.
    Hold,
}

/// A submission parked until its identity becomes active.
#[derive(Debug, Clone)]
pub struct HeldSubmission {
    /// The submitting identity.
    pub identity: Uuid,
    /// The payload to promote when the turn arrives.
    pub payload: String,
    /// When the submission was buffered.
    pub held_at: DateTime<Utc>,
}

/// Result of advancing the turn.
#[derive(Debug, Clone)]
pub struct Advance {
    /// The newly active identity.
    pub active: Uuid,
    /// Held submissions to promote into the queue, in held order.
    pub promoted: Vec<HeldSubmission>,
}

#[derive(Debug)]
struct Phase {
    order: Vec<Uuid>,
    active: usize,
    mode: TurnMode,
    activated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct GateState {
    phase: Option<Phase>,
    held: HashMap<Uuid, VecDeque<HeldSubmission>>,
}

/// Admission gate layered over the action queue during structured phases.
/// Outside a phase (and in Simultaneous mode) everything is admitted.
pub struct TurnGate {
    clock: Arc<dyn Clock>,
    hold_capacity: usize,
    inner: Mutex<GateState>,
}

impl TurnGate {
    /// Creates a gate with the given per-identity holding-buffer capacity.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, hold_capacity: usize) -> Self {
        Self {
            clock,
            hold_capacity,
            inner: Mutex::new(GateState::default()),
        }
    }

    /// Begins a structured phase with the given initiative order. Returns
    /// the first active identity for Sequential mode.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Validation` for an empty initiative order.
    pub fn begin_phase(
        &self,
        order: Vec<Uuid>,
        mode: TurnMode,
    ) -> Result<Option<Uuid>, RelayError> {
        if order.is_empty() {
            return Err(RelayError::Validation(
                "initiative order must not be empty".to_owned(),
            ));
        }

        let first = order[0];
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // A new phase starts with empty buffers; leftovers from a prior
        // phase must be promoted by the caller before this point.
        let leftover: usize = state.held.values().map(VecDeque::len).sum();
        if leftover > 0 {
            tracing::warn!(dropped = leftover, "discarding held submissions from prior phase");
            state.held.clear();
        }
        state.phase = Some(Phase {
            order,
            active: 0,
            mode,
            activated_at: self.clock.now(),
        });
        tracing::info!(?mode, "structured phase began");
        Ok(match mode {
            TurnMode::Sequential => Some(first),
            TurnMode::Simultaneous => None,
        })
    }

    /// Ends the structured phase, draining every remaining held submission
    /// for promotion (admission becomes open again, so nothing may stay
    /// parked). Idempotent-safe: returns empty when no phase is active.
    pub fn end_phase(&self) -> Vec<HeldSubmission> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.phase = None;
        let mut drained: Vec<HeldSubmission> = state
            .held
            .drain()
            .flat_map(|(_, buffer)| buffer)
            .collect();
        drained.sort_by_key(|held| held.held_at);
        if !drained.is_empty() {
            tracing::info!(promoted = drained.len(), "phase ended, held submissions drained");
        }
        drained
    }

    /// Decides whether `identity` may submit directly right now.
    ///
    /// Identities outside the initiative order (the Host narrating
    /// mid-encounter, for instance) are never turn-constrained.
    #[must_use]
    pub fn check(&self, identity: Uuid) -> Admissibility {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match &state.phase {
            None => Admissibility::Admit,
            Some(phase) => match phase.mode {
                TurnMode::Simultaneous => Admissibility::Admit,
                TurnMode::Sequential => {
                    let is_active = phase.order.get(phase.active) == Some(&identity);
                    let in_order = phase.order.contains(&identity);
                    if is_active || !in_order {
                        Admissibility::Admit
                    } else {
                        Admissibility::Hold
                    }
                }
            },
        }
    }

    /// Buffers an out-of-turn submission, FIFO per identity. Returns the
    /// 1-based position within the identity's buffer.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::HoldBufferFull` when the buffer is at capacity;
    /// the caller should retry later.
    pub fn hold(&self, identity: Uuid, payload: String) -> Result<usize, RelayError> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = state.held.entry(identity).or_default();
        if buffer.len() >= self.hold_capacity {
            return Err(RelayError::HoldBufferFull { identity });
        }
        buffer.push_back(HeldSubmission {
            identity,
            payload,
            held_at: self.clock.now(),
        });
        tracing::debug!(%identity, buffered = buffer.len(), "submission held until turn");
        Ok(buffer.len())
    }

    /// Advances to the next identity in initiative order and drains that
    /// identity's held submissions for promotion. No-op (`None`) when no
    /// structured phase is active.
    pub fn advance(&self) -> Option<Advance> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let phase = state.phase.as_mut()?;
        phase.active = (phase.active + 1) % phase.order.len();
        phase.activated_at = now;
        let active = phase.order[phase.active];

        let promoted: Vec<HeldSubmission> = state
            .held
            .get_mut(&active)
            .map(|buffer| buffer.drain(..).collect())
            .unwrap_or_default();

        tracing::info!(%active, promoted = promoted.len(), "turn advanced");
        Some(Advance { active, promoted })
    }

    /// The currently active identity, for Sequential phases.
    #[must_use]
    pub fn active_identity(&self) -> Option<Uuid> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.phase.as_ref().and_then(|phase| match phase.mode {
            TurnMode::Sequential => phase.order.get(phase.active).copied(),
            TurnMode::Simultaneous => None,
        })
    }

    /// The mode of the active phase, if one is running.
    #[must_use]
    pub fn mode(&self) -> Option<TurnMode> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.phase.as_ref().map(|phase| phase.mode)
    }

    /// Whether the active identity has held the turn longer than
    /// `skip_after`. The skip itself is triggered externally; the gate
    /// never advances on its own.
    #[must_use]
    pub fn stalled(&self, now: DateTime<Utc>, skip_after: Duration) -> bool {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .phase
            .as_ref()
            .is_some_and(|phase| {
                phase.mode == TurnMode::Sequential && now - phase.activated_at > skip_after
            })
    }
}
