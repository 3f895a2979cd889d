//! Tableside — action queue and turn gate.
//!
//! The action queue is the system's sole serialization point: a strictly
//! FIFO, journalled record of participant actions of which at most one is
//! ever in flight with the external decision engine. The turn gate layers
//! an optional admission constraint on top during structured encounters.

pub mod action_queue;
pub mod turn_gate;

pub use action_queue::{ActionQueue, StuckAction, SubmittedAction};
pub use turn_gate::{Admissibility, Advance, HeldSubmission, TurnGate, TurnMode};
