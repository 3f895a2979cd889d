//! Turn-phase mode shared across components.

use serde::{Deserialize, Serialize};

/// Whether action admission is gated by a turn order or open to all
/// identities at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// One identity acts at a time, in initiative order.
    Sequential,
    /// Everyone may submit; the engine combines results.
    Simultaneous,
}
