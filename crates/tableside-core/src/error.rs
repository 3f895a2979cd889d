//! Relay error taxonomy.

use thiserror::Error;
use uuid::Uuid;

use crate::action::ActionStatus;
use crate::identity::Role;

/// Authentication failures. Always rejected synchronously, never degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("missing token")]
    MissingToken,

    /// The presented token value is not known to the registry.
    #[error("unknown token")]
    UnknownToken,

    /// The presented token has been revoked.
    #[error("revoked token")]
    RevokedToken,

    /// The token is valid but the identity's role does not permit the
    /// operation.
    #[error("forbidden: requires {required} role")]
    Forbidden {
        /// The role the operation requires.
        required: Role,
    },
}

/// Top-level relay error type.
#[derive(Debug, Error)]
pub enum RelayError {
    /// An authentication or authorization failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// An out-of-turn submission could not be held: the identity's holding
    /// buffer is full. The caller should retry later.
    #[error("holding buffer full for identity {identity}")]
    HoldBufferFull {
        /// The identity whose buffer is full.
        identity: Uuid,
    },

    /// No action with the given id exists.
    #[error("unknown action: {0}")]
    UnknownAction(Uuid),

    /// No identity with the given key is registered.
    #[error("unknown identity: {0}")]
    UnknownIdentity(Uuid),

    /// No live connection with the given id exists.
    #[error("unknown connection: {0}")]
    UnknownConnection(Uuid),

    /// An identity with this label is already registered and active.
    #[error("identity already registered: {0}")]
    DuplicateIdentity(String),

    /// An operation was attempted against an action in the wrong state.
    #[error("invalid transition for action {action_id}: {from} -> {attempted}")]
    InvalidTransition {
        /// The action the operation targeted.
        action_id: Uuid,
        /// The action's current status.
        from: ActionStatus,
        /// The status the operation would have produced.
        attempted: ActionStatus,
    },

    /// A turn operation was invoked while no structured phase is active.
    #[error("no structured phase is active")]
    NoActivePhase,

    /// A validation error in relay logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The queue's append-order invariant was violated. Fatal to the
    /// session: the queue refuses further work rather than continue in an
    /// inconsistent state.
    #[error("queue ordering violated: {0}")]
    OrderingViolated(String),

    /// A durable-journal failure.
    #[error("journal error: {0}")]
    Journal(String),
}
