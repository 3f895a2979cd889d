//! The relay: admission, serialization, and fan-out.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

use tableside_auth::{Roster, Token, TokenRegistry};
use tableside_core::action::{Action, ActionStatus};
use tableside_core::clock::Clock;
use tableside_core::error::{AuthError, RelayError};
use tableside_core::identity::{Identity, Role};
use tableside_core::journal::ActionJournal;
use tableside_core::outcome::Outcome;
use tableside_core::turn::TurnMode;
use tableside_hub::{ConnectionHub, OutboundFrame, StatusNotice, project};
use tableside_queue::{ActionQueue, Admissibility, TurnGate};

use crate::config::RelayConfig;

/// Synchronous acknowledgment for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionReceipt {
    /// Admitted into the queue.
    Queued {
        /// The admitted action.
        action_id: Uuid,
        /// 1-based position among pending actions.
        position: usize,
    },
    /// Out of turn: buffered, and will be admitted when the submitter's
    /// turn arrives. Never silent.
    Held {
        /// 1-based position within the submitter's holding buffer.
        position: usize,
    },
}

/// Composes the token registry, roster, action queue, turn gate, and
/// connection hub into one session relay.
pub struct Relay {
    config: RelayConfig,
    clock: Arc<dyn Clock>,
    tokens: TokenRegistry,
    roster: Roster,
    queue: ActionQueue,
    gate: TurnGate,
    hub: ConnectionHub,
    host_key: Uuid,
    observer_key: Uuid,
    /// Stuck actions already alerted to the Host, so sweeps do not repeat
    /// the same fault every tick.
    alerted_stuck: Mutex<HashSet<Uuid>>,
}

impl Relay {
    /// Opens a session: registers the Host and the reserved read-only
    /// Observer identity, issues the Host's token, and recovers any queue
    /// state the journal holds from a previous run.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` or `RelayError::OrderingViolated` if
    /// recovery fails.
    pub async fn open_session(
        host_label: &str,
        config: RelayConfig,
        journal: Arc<dyn ActionJournal>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, Token), RelayError> {
        let roster = Roster::new();
        let host = roster.register(host_label, Role::Host, None)?;
        let observer = roster.register("Observer", Role::Observer, None)?;

        let tokens = TokenRegistry::new(Arc::clone(&clock));
        let host_token = tokens.issue(host.key);

        let queue = ActionQueue::recover(journal, Arc::clone(&clock)).await?;
        let gate = TurnGate::new(Arc::clone(&clock), config.hold_capacity);
        let hub = ConnectionHub::new(Arc::clone(&clock));

        tracing::info!(host = host_label, "session opened");
        Ok((
            Self {
                config,
                clock,
                tokens,
                roster,
                queue,
                gate,
                hub,
                host_key: host.key,
                observer_key: observer.key,
                alerted_stuck: Mutex::new(HashSet::new()),
            },
            host_token,
        ))
    }

    fn authenticate(&self, token: &str) -> Result<(Uuid, Role), RelayError> {
        let key = self.tokens.validate(token)?;
        let registration = self.roster.resolve(key)?;
        Ok((key, registration.role))
    }

    fn require_host(&self, token: &str) -> Result<Uuid, RelayError> {
        let (key, role) = self.authenticate(token)?;
        if role == Role::Host {
            Ok(key)
        } else {
            Err(AuthError::Forbidden {
                required: Role::Host,
            }
            .into())
        }
    }

    // --- session membership ---

    /// Admits a new participant (Host only): registers the identity and
    /// issues its first token.
    ///
    /// # Errors
    ///
    /// Returns auth errors, or `RelayError::DuplicateIdentity` if the
    /// label is taken.
    pub fn admit_participant(
        &self,
        host_token: &str,
        label: &str,
        owned_entity: Option<Uuid>,
    ) -> Result<(Identity, Token), RelayError> {
        self.require_host(host_token)?;
        let identity = self
            .roster
            .register(label, Role::Participant, owned_entity)?;
        let token = self.tokens.issue(identity.key);
        Ok((identity, token))
    }

    /// Issues (or rotates) the shared read-only Observer token (Host
    /// only).
    ///
    /// # Errors
    ///
    /// Returns auth errors.
    pub fn observer_token(&self, host_token: &str) -> Result<Token, RelayError> {
        self.require_host(host_token)?;
        Ok(self.tokens.issue(self.observer_key))
    }

    /// Re-issues a participant's token, revoking the previous one (Host
    /// only).
    ///
    /// # Errors
    ///
    /// Returns auth errors or `RelayError::UnknownIdentity`.
    pub fn refresh_token(&self, host_token: &str, identity: Uuid) -> Result<Token, RelayError> {
        self.require_host(host_token)?;
        self.roster.resolve(identity)?;
        Ok(self.tokens.issue(identity))
    }

    /// Revokes a participant's token without replacement (Host only). The
    /// identity and its owned entity stay registered.
    ///
    /// # Errors
    ///
    /// Returns auth errors or `RelayError::UnknownIdentity`.
    pub fn revoke_token(&self, host_token: &str, identity: Uuid) -> Result<(), RelayError> {
        self.require_host(host_token)?;
        self.roster.resolve(identity)?;
        self.tokens.revoke(identity);
        Ok(())
    }

    // --- live connections ---

    /// Opens a live channel for the token's identity. The returned
    /// receiver yields this connection's outbound frames in emission
    /// order.
    ///
    /// # Errors
    ///
    /// Returns auth errors.
    pub fn connect(
        &self,
        token: &str,
    ) -> Result<(Uuid, mpsc::UnboundedReceiver<OutboundFrame>), RelayError> {
        let (identity, _) = self.authenticate(token)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection_id = self.hub.register(identity, sender);
        Ok((connection_id, receiver))
    }

    /// Records a connection heartbeat.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownConnection`.
    pub fn heartbeat(&self, connection_id: Uuid) -> Result<(), RelayError> {
        self.hub.heartbeat(connection_id)
    }

    /// Removes a connection (client-initiated close).
    pub fn disconnect(&self, connection_id: Uuid) {
        self.hub.unregister(connection_id);
    }

    /// Forcibly drops a connection (Host only).
    ///
    /// # Errors
    ///
    /// Returns auth errors or `RelayError::UnknownConnection`.
    pub fn drop_connection(&self, host_token: &str, connection_id: Uuid) -> Result<(), RelayError> {
        self.require_host(host_token)?;
        if self.hub.unregister(connection_id) {
            Ok(())
        } else {
            Err(RelayError::UnknownConnection(connection_id))
        }
    }

    // --- submission ---

    /// Admits a participant submission: authenticate, resolve the role,
    /// apply the turn gate, then queue or hold. Observers may not submit.
    ///
    /// # Errors
    ///
    /// Returns auth errors, `RelayError::Validation` for an empty payload,
    /// `RelayError::HoldBufferFull` when out of turn with a full buffer,
    /// or journal/poisoned-queue failures.
    pub async fn submit(&self, token: &str, payload: &str) -> Result<SubmissionReceipt, RelayError> {
        let (identity, role) = self.authenticate(token)?;
        if role == Role::Observer {
            return Err(AuthError::Forbidden {
                required: Role::Participant,
            }
            .into());
        }
        if payload.trim().is_empty() {
            return Err(RelayError::Validation("payload must not be empty".into()));
        }

        match self.gate.check(identity) {
            Admissibility::Admit => {
                let submitted = self.queue.submit(identity, payload.to_owned(), false).await?;
                self.notify_queued(identity, submitted.action_id, submitted.position);
                Ok(SubmissionReceipt::Queued {
                    action_id: submitted.action_id,
                    position: submitted.position,
                })
            }
            Admissibility::Hold => {
                let position = self.gate.hold(identity, payload.to_owned())?;
                tracing::debug!(%identity, position, "submission held for turn");
                Ok(SubmissionReceipt::Held { position })
            }
        }
    }

    /// Status of an action, visible to its submitter and to the Host.
    ///
    /// # Errors
    ///
    /// Returns auth errors, `RelayError::UnknownAction`, or `Forbidden`
    /// for other identities' actions.
    pub async fn action_status(&self, token: &str, action_id: Uuid) -> Result<ActionStatus, RelayError> {
        let (identity, role) = self.authenticate(token)?;
        let action = self.queue.action(action_id).await?;
        if action.identity != identity && role != Role::Host {
            return Err(AuthError::Forbidden {
                required: Role::Host,
            }
            .into());
        }
        Ok(action.status)
    }

    // --- decision-engine interface ---

    /// Takes the next action for the external decision engine, waiting
    /// while the queue is empty or another action is in flight.
    ///
    /// # Errors
    ///
    /// Returns journal or poisoned-queue failures.
    pub async fn take_next(&self) -> Result<Action, RelayError> {
        let action = self.queue.take_next().await?;
        self.notify_processing(&action);
        Ok(action)
    }

    /// Non-blocking variant of [`take_next`](Self::take_next).
    ///
    /// # Errors
    ///
    /// Returns journal or poisoned-queue failures.
    pub async fn try_take_next(&self) -> Result<Option<Action>, RelayError> {
        let action = self.queue.try_take_next().await?;
        if let Some(action) = &action {
            self.notify_processing(action);
        }
        Ok(action)
    }

    /// Resolves the InFlight action and fans the outcome out to every
    /// connected identity through the visibility filter — one projection
    /// per identity, not one globally.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownAction`, `RelayError::InvalidTransition`
    /// if the action is not InFlight, or journal failures.
    pub async fn resolve(&self, action_id: Uuid, outcome: Outcome) -> Result<(), RelayError> {
        let outcome = Outcome {
            action_id,
            ..outcome
        };
        self.queue.resolve(action_id, outcome.clone()).await?;

        let delivered = self.hub.broadcast_with(|identity| {
            let role = self.roster.resolve(identity).ok()?.role;
            Some(OutboundFrame::Result {
                view: project(&outcome, identity, role),
            })
        });
        // Stuck alert state resets once the action finally resolves.
        self.alerted_stuck
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&action_id);
        tracing::info!(%action_id, delivered, "outcome fanned out");
        Ok(())
    }

    /// Returns a stuck InFlight action to Pending (Host only, explicit
    /// operator action).
    ///
    /// # Errors
    ///
    /// Returns auth errors, `RelayError::UnknownAction`, or
    /// `RelayError::InvalidTransition`.
    pub async fn release_stuck(&self, host_token: &str, action_id: Uuid) -> Result<(), RelayError> {
        self.require_host(host_token)?;
        self.queue.release_in_flight(action_id).await?;
        self.alerted_stuck
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&action_id);
        Ok(())
    }

    // --- structured encounters ---

    /// Begins a structured phase with the given initiative order (Host
    /// only). Every identity in the order must be registered. Submissions
    /// still held from a previous phase are promoted into the queue first;
    /// they never carry over into the new phase.
    ///
    /// # Errors
    ///
    /// Returns auth errors, `RelayError::UnknownIdentity`,
    /// `RelayError::Validation` for an empty order, or queue/journal
    /// failures during promotion.
    pub async fn begin_encounter(
        &self,
        host_token: &str,
        order: Vec<Uuid>,
        mode: TurnMode,
    ) -> Result<(), RelayError> {
        self.require_host(host_token)?;
        if order.is_empty() {
            return Err(RelayError::Validation(
                "initiative order must not be empty".to_owned(),
            ));
        }
        for identity in &order {
            self.roster.resolve(*identity)?;
        }
        for held in self.gate.end_phase() {
            let submitted = self.queue.submit(held.identity, held.payload, true).await?;
            self.notify_queued(held.identity, submitted.action_id, submitted.position);
        }
        let active = self.gate.begin_phase(order, mode)?;
        self.hub.broadcast_with(|_| {
            Some(OutboundFrame::TurnNotice {
                active,
                mode: Some(mode),
            })
        });
        Ok(())
    }

    /// Ends the structured phase (Host only), promoting every remaining
    /// held submission into the queue.
    ///
    /// # Errors
    ///
    /// Returns auth errors or queue/journal failures during promotion.
    pub async fn end_encounter(&self, host_token: &str) -> Result<(), RelayError> {
        self.require_host(host_token)?;
        let drained = self.gate.end_phase();
        for held in drained {
            let submitted = self.queue.submit(held.identity, held.payload, true).await?;
            self.notify_queued(held.identity, submitted.action_id, submitted.position);
        }
        self.hub.broadcast_with(|_| {
            Some(OutboundFrame::TurnNotice {
                active: None,
                mode: None,
            })
        });
        Ok(())
    }

    /// Advances the turn (Host only): the next identity in initiative
    /// order becomes active and its held submissions are promoted into the
    /// queue in held order.
    ///
    /// # Errors
    ///
    /// Returns auth errors, `RelayError::NoActivePhase` outside a
    /// structured phase, or queue/journal failures during promotion.
    pub async fn advance_turn(&self, host_token: &str) -> Result<Uuid, RelayError> {
        self.require_host(host_token)?;
        self.do_advance().await?.ok_or(RelayError::NoActivePhase)
    }

    async fn do_advance(&self) -> Result<Option<Uuid>, RelayError> {
        let Some(advance) = self.gate.advance() else {
            return Ok(None);
        };
        for held in advance.promoted {
            let submitted = self.queue.submit(held.identity, held.payload, true).await?;
            self.notify_queued(held.identity, submitted.action_id, submitted.position);
        }
        let mode = self.gate.mode();
        self.hub.broadcast_with(|_| {
            Some(OutboundFrame::TurnNotice {
                active: Some(advance.active),
                mode,
            })
        });
        Ok(Some(advance.active))
    }

    // --- background sweep ---

    /// One pass of the operational sweep: reports freshly stale
    /// connections and stuck InFlight actions to the Host, and skips the
    /// turn of a disconnected active identity past the skip window.
    /// Faults are reported, never silently repaired.
    pub async fn sweep(&self) {
        let now = self.clock.now();

        for stale in self.hub.mark_stale(now, self.config.heartbeat_timeout) {
            self.hub.send_to_identity(
                self.host_key,
                &OutboundFrame::Status {
                    notice: StatusNotice::ConnectionStale {
                        connection_id: stale.connection_id,
                        identity: stale.identity,
                        last_seen: stale.last_seen,
                    },
                },
            );
        }

        if let Some(stuck) = self.queue.stuck_in_flight(now, self.config.stuck_ceiling).await {
            let already_alerted = self
                .alerted_stuck
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&stuck.action_id);
            if !already_alerted {
                tracing::warn!(action_id = %stuck.action_id, "in-flight action exceeded stuck ceiling");
                let delivered = self.hub.send_to_identity(
                    self.host_key,
                    &OutboundFrame::Status {
                        notice: StatusNotice::QueueFault {
                            action_id: stuck.action_id,
                            identity: stuck.identity,
                            taken_at: stuck.taken_at,
                        },
                    },
                );
                // The alert is one-shot only once a Host connection has
                // actually received it; retry on later sweeps otherwise.
                if delivered > 0 {
                    self.alerted_stuck
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(stuck.action_id);
                }
            }
        }

        if let Some(active) = self.gate.active_identity() {
            if !self.hub.has_live_connection(active)
                && self.gate.stalled(now, self.config.turn_skip_after)
            {
                tracing::warn!(%active, "skipping turn of disconnected active identity");
                if let Ok(Some(next_active)) = self.do_advance().await {
                    self.hub.send_to_identity(
                        self.host_key,
                        &OutboundFrame::Status {
                            notice: StatusNotice::TurnSkipped {
                                skipped: active,
                                active: next_active,
                            },
                        },
                    );
                }
            }
        }
    }

    /// The Host identity key.
    #[must_use]
    pub fn host_key(&self) -> Uuid {
        self.host_key
    }

    /// The currently active identity during a Sequential phase.
    #[must_use]
    pub fn active_identity(&self) -> Option<Uuid> {
        self.gate.active_identity()
    }

    fn notify_queued(&self, identity: Uuid, action_id: Uuid, position: usize) {
        self.hub.send_to_identity(
            identity,
            &OutboundFrame::Status {
                notice: StatusNotice::ActionQueued {
                    action_id,
                    position,
                },
            },
        );
    }

    fn notify_processing(&self, action: &Action) {
        self.hub.send_to_identity(
            action.identity,
            &OutboundFrame::Status {
                notice: StatusNotice::ActionProcessing {
                    action_id: action.id,
                },
            },
        );
    }
}
