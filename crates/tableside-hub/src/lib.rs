//! Tableside — live connections and permission-filtered fan-out.
//!
//! The connection hub tracks every live transport endpoint, its liveness,
//! and its outbound channel. The visibility filter is the single
//! enforcement point preventing information leakage between participants.

pub mod connection_hub;
pub mod frames;
pub mod visibility;

pub use connection_hub::{ConnectionHub, StaleConnection};
pub use frames::{OutboundFrame, StatusNotice};
pub use visibility::project;
