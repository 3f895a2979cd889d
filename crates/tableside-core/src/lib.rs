//! Tableside Core — shared domain abstractions.
//!
//! This crate defines the fundamental types and traits that all relay
//! components depend on. It contains no infrastructure code.

pub mod action;
pub mod clock;
pub mod error;
pub mod identity;
pub mod journal;
pub mod outcome;
pub mod turn;
