//! Session roster — identity registration and role resolution.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tableside_core::error::RelayError;
use tableside_core::identity::{Identity, Role};
use uuid::Uuid;

/// The resolved registration for an identity.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display label.
    pub label: String,
    /// Session role.
    pub role: Role,
    /// The entity this identity controls, if any.
    pub owned_entity: Option<Uuid>,
}

/// Session-scoped registration state. Registration happens once per identity
/// at admission time; everything else is pure lookup.
#[derive(Debug, Default)]
pub struct Roster {
    inner: RwLock<HashMap<Uuid, Identity>>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new identity. Labels must be unique among registered
    /// identities; re-registration is rejected (token refresh for an
    /// existing identity goes through the token registry instead).
    ///
    /// # Errors
    ///
    /// Returns `RelayError::DuplicateIdentity` if the label is taken.
    pub fn register(
        &self,
        label: &str,
        role: Role,
        owned_entity: Option<Uuid>,
    ) -> Result<Identity, RelayError> {
        let mut identities = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if identities.values().any(|i| i.label == label) {
            return Err(RelayError::DuplicateIdentity(label.to_owned()));
        }

        let identity = Identity {
            key: Uuid::new_v4(),
            label: label.to_owned(),
            role,
            owned_entity,
        };
        identities.insert(identity.key, identity.clone());
        tracing::info!(key = %identity.key, %role, label, "identity registered");
        Ok(identity)
    }

    /// Resolves an identity key to its registration.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::UnknownIdentity` for unregistered keys.
    pub fn resolve(&self, key: Uuid) -> Result<Registration, RelayError> {
        let identities = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        identities
            .get(&key)
            .map(|i| Registration {
                label: i.label.clone(),
                role: i.role,
                owned_entity: i.owned_entity,
            })
            .ok_or(RelayError::UnknownIdentity(key))
    }

    /// Returns the key of the identity holding the given role, if exactly
    /// such an identity exists. Used for Host and the reserved Observer.
    #[must_use]
    pub fn key_of_role(&self, role: Role) -> Option<Uuid> {
        let identities = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        identities.values().find(|i| i.role == role).map(|i| i.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_resolve_returns_role_and_entity() {
        let roster = Roster::new();
        let entity = Uuid::new_v4();

        let identity = roster
            .register("Brielle", Role::Participant, Some(entity))
            .unwrap();
        let registration = roster.resolve(identity.key).unwrap();

        assert_eq!(registration.role, Role::Participant);
        assert_eq!(registration.owned_entity, Some(entity));
        assert_eq!(registration.label, "Brielle");
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let roster = Roster::new();
        roster.register("Corvin", Role::Participant, None).unwrap();

        let result = roster.register("Corvin", Role::Participant, None);

        match result {
            Err(RelayError::DuplicateIdentity(label)) => assert_eq!(label, "Corvin"),
            other => panic!("expected DuplicateIdentity, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_unknown_identity_returns_error() {
        let roster = Roster::new();

        let result = roster.resolve(Uuid::new_v4());

        assert!(matches!(result, Err(RelayError::UnknownIdentity(_))));
    }

    #[test]
    fn test_key_of_role_finds_host() {
        let roster = Roster::new();
        let host = roster.register("GM", Role::Host, None).unwrap();
        roster.register("Player", Role::Participant, None).unwrap();

        assert_eq!(roster.key_of_role(Role::Host), Some(host.key));
    }

    #[test]
    fn test_observer_has_no_owned_entity() {
        let roster = Roster::new();

        let observer = roster.register("Observer", Role::Observer, None).unwrap();

        assert_eq!(observer.owned_entity, None);
        assert_eq!(roster.resolve(observer.key).unwrap().role, Role::Observer);
    }
}
