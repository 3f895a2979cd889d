//! Per-identity projection of engine outcomes.
//!
//! This is the enforcement point preventing information leakage between
//! participants: it is called once per outcome per connected identity,
//! never globally.

use uuid::Uuid;

use tableside_core::identity::Role;
use tableside_core::outcome::{Outcome, OutcomeView};

/// Projects an outcome down to what one identity may see. Pure and total:
/// the public block is always included, a private block only for its
/// annotated recipient, host notes only for the Host role.
#[must_use]
pub fn project(outcome: &Outcome, identity: Uuid, role: Role) -> OutcomeView {
    OutcomeView {
        action_id: outcome.action_id,
        public: outcome.public.clone(),
        private: outcome
            .private
            .iter()
            .filter(|block| block.recipient == identity)
            .map(|block| block.content.clone())
            .collect(),
        host_notes: match role {
            Role::Host => outcome.host_notes.clone(),
            Role::Participant | Role::Observer => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableside_core::outcome::PrivateBlock;

    fn outcome(recipient_a: Uuid, recipient_b: Uuid) -> Outcome {
        Outcome {
            action_id: Uuid::new_v4(),
            public: "The bridge groans under the weight.".to_owned(),
            private: vec![
                PrivateBlock {
                    recipient: recipient_a,
                    content: "You notice a frayed rope.".to_owned(),
                },
                PrivateBlock {
                    recipient: recipient_b,
                    content: "Your ring hums faintly.".to_owned(),
                },
                PrivateBlock {
                    recipient: recipient_a,
                    content: "The rope will snap on the next crossing.".to_owned(),
                },
            ],
            host_notes: Some("bridge collapses in two rounds".to_owned()),
        }
    }

    #[test]
    fn test_public_block_is_always_included() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let outcome = outcome(a, b);

        for (identity, role) in [
            (a, Role::Participant),
            (b, Role::Participant),
            (Uuid::new_v4(), Role::Observer),
            (Uuid::new_v4(), Role::Host),
        ] {
            let view = project(&outcome, identity, role);
            assert_eq!(view.public, outcome.public);
        }
    }

    #[test]
    fn test_private_blocks_never_cross_identities() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let outcome = outcome(a, b);

        let view_a = project(&outcome, a, Role::Participant);
        let view_b = project(&outcome, b, Role::Participant);

        assert_eq!(
            view_a.private,
            vec![
                "You notice a frayed rope.".to_owned(),
                "The rope will snap on the next crossing.".to_owned(),
            ]
        );
        assert_eq!(view_b.private, vec!["Your ring hums faintly.".to_owned()]);
    }

    #[test]
    fn test_identity_with_no_private_content_gets_empty_section() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let outcome = outcome(a, b);

        let view = project(&outcome, Uuid::new_v4(), Role::Participant);

        assert!(view.private.is_empty());
    }

    #[test]
    fn test_host_notes_are_host_only() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let outcome = outcome(a, b);

        assert!(project(&outcome, a, Role::Participant).host_notes.is_none());
        assert!(project(&outcome, b, Role::Observer).host_notes.is_none());
        assert_eq!(
            project(&outcome, Uuid::new_v4(), Role::Host).host_notes,
            Some("bridge collapses in two rounds".to_owned())
        );
    }

    #[test]
    fn test_projection_is_total_for_empty_outcome() {
        let empty = Outcome {
            action_id: Uuid::new_v4(),
            public: String::new(),
            private: vec![],
            host_notes: None,
        };

        let view = project(&empty, Uuid::new_v4(), Role::Participant);

        assert!(view.public.is_empty());
        assert!(view.private.is_empty());
        assert!(view.host_notes.is_none());
    }
}
