//! Tableside — relay composition root.
//!
//! The relay wires authentication, turn gating, the action queue, and the
//! connection hub together. It holds no business state of its own: all
//! state lives in the components it composes.

pub mod config;
pub mod relay;
pub mod sweeper;

pub use config::RelayConfig;
pub use relay::{Relay, SubmissionReceipt};
pub use sweeper::spawn_sweeper;
