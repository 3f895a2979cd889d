//! Shared test mocks and utilities for the Tableside session relay.

mod clock;
mod journal;

pub use clock::{FixedClock, MutableClock};
pub use journal::{FailingJournal, MemoryJournal};
