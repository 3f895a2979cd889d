//! Relay tuning knobs.

use chrono::Duration;

/// Configurable policies for one relay session.
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// A connection missing heartbeats for longer than this is flagged
    /// stale (reported to the Host, not closed).
    pub heartbeat_timeout: Duration,
    /// An InFlight action older than this raises a queue fault to the
    /// Host. It is never auto-resolved.
    pub stuck_ceiling: Duration,
    /// Per-identity capacity of the out-of-turn holding buffer.
    pub hold_capacity: usize,
    /// A disconnected active identity holding the turn longer than this is
    /// skipped by the background sweep.
    pub turn_skip_after: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::seconds(30),
            stuck_ceiling: Duration::seconds(120),
            hold_capacity: 8,
            turn_skip_after: Duration::seconds(90),
        }
    }
}
