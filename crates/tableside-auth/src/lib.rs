//! Tableside — authentication and session roster.
//!
//! Responsible for issuing and validating per-participant bearer tokens
//! and for resolving identities to their session role and owned entity.

pub mod roster;
pub mod token_registry;

pub use roster::{Registration, Roster};
pub use token_registry::{Token, TokenRegistry};
