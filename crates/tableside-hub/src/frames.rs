//! Outbound frame types for the live channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tableside_core::outcome::OutcomeView;
use tableside_core::turn::TurnMode;

/// Operational notices carried on `status` frames. Participant-facing
/// notices track their own actions; fault notices go to the Host channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusNotice {
    /// The submitter's action was admitted to the queue.
    ActionQueued {
        /// The admitted action.
        action_id: Uuid,
        /// 1-based position among pending actions.
        position: usize,
    },
    /// The decision engine took the submitter's action.
    ActionProcessing {
        /// The action now in flight.
        action_id: Uuid,
    },
    /// Host alert: an InFlight action exceeded the stuck-action ceiling.
    QueueFault {
        /// The stuck action.
        action_id: Uuid,
        /// Its submitting identity.
        identity: Uuid,
        /// When the engine took it.
        taken_at: DateTime<Utc>,
    },
    /// Host alert: a connection missed its heartbeat window.
    ConnectionStale {
        /// The stale connection.
        connection_id: Uuid,
        /// Its owning identity.
        identity: Uuid,
        /// Last heartbeat seen.
        last_seen: DateTime<Utc>,
    },
    /// Host alert: a disconnected active identity was skipped by timeout.
    TurnSkipped {
        /// The identity whose turn was skipped.
        skipped: Uuid,
        /// The newly active identity.
        active: Uuid,
    },
}

/// A frame emitted to a live connection. Each connection receives frames
/// in relay emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundFrame {
    /// A visibility-filtered outcome for one resolved action.
    Result {
        /// The recipient's view of the outcome.
        view: OutcomeView,
    },
    /// The turn changed (or a structured phase began/ended).
    TurnNotice {
        /// The newly active identity; `None` for Simultaneous phases and
        /// phase end.
        active: Option<Uuid>,
        /// The phase mode; `None` when the phase ended.
        mode: Option<TurnMode>,
    },
    /// An operational status notice.
    Status {
        /// The notice payload.
        notice: StatusNotice,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_serialize_with_kebab_case_type_tags() {
        let frame = OutboundFrame::TurnNotice {
            active: Some(Uuid::nil()),
            mode: Some(TurnMode::Sequential),
        };

        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "turn-notice");
        assert_eq!(json["mode"], "sequential");
    }

    #[test]
    fn test_status_notice_carries_snake_case_kind() {
        let frame = OutboundFrame::Status {
            notice: StatusNotice::ActionQueued {
                action_id: Uuid::nil(),
                position: 2,
            },
        };

        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "status");
        assert_eq!(json["notice"]["kind"], "action_queued");
        assert_eq!(json["notice"]["position"], 2);
    }
}
