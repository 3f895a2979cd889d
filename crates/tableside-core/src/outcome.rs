//! Decision-engine outcomes and their per-identity projections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content block addressed to exactly one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateBlock {
    /// The only identity allowed to see this block.
    pub recipient: Uuid,
    /// The private content.
    pub content: String,
}

/// The engine's result for one resolved action. Immutable once created;
/// exactly one exists per resolved action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    /// The action this outcome resolves.
    pub action_id: Uuid,
    /// Content visible to every connected identity.
    pub public: String,
    /// Content restricted to individual recipients.
    #[serde(default)]
    pub private: Vec<PrivateBlock>,
    /// Annotations visible to the Host only.
    #[serde(default)]
    pub host_notes: Option<String>,
}

/// The slice of an [`Outcome`] a single identity is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeView {
    /// The action this view belongs to.
    pub action_id: Uuid,
    /// The public content block, always present.
    pub public: String,
    /// Private blocks addressed to the viewing identity, in outcome order.
    pub private: Vec<String>,
    /// Host-only annotations; `None` for any non-Host viewer.
    pub host_notes: Option<String>,
}
