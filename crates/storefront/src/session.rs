//! Session store.
//!
//! Holds the signed-in identity as a cache over [`SessionStorage`]. Storage
//! is authoritative: every query re-reads it, and the cached [`Session`] is
//! rebuilt or dropped whenever the two disagree. This is what makes a 401
//! handled by the gateway (which clears storage directly) show up here as a
//! logout without any extra wiring.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use autoparts_core::Role;

use crate::storage::{SessionStorage, StorageKey};

/// The client's belief about who is signed in.
pub struct Session {
    /// Account email.
    pub identity: String,
    credential: SecretString,
    pub role: Role,
}

impl Session {
    #[must_use]
    pub fn new(identity: impl Into<String>, credential: SecretString, role: Role) -> Self {
        Self {
            identity: identity.into(),
            credential,
            role,
        }
    }

    /// Bearer token issued by the API.
    #[must_use]
    pub const fn credential(&self) -> &SecretString {
        &self.credential
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    fn same_as(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.role == other.role
            && self.credential.expose_secret() == other.credential.expose_secret()
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            credential: SecretString::from(self.credential.expose_secret().to_owned()),
            role: self.role,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("credential", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Process-wide session state.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    cache: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store over `storage`. Call [`SessionStore::restore`]
    /// to pick up a session persisted by an earlier run.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            cache: RwLock::new(None),
        }
    }

    /// Load the persisted session, if storage holds both a credential and an
    /// identity. Returns whether a session was restored.
    pub fn restore(&self) -> bool {
        let persisted = self.persisted();
        let restored = persisted.is_some();
        if let Some(session) = &persisted {
            debug!(email = %session.identity, role = %session.role, "Restored session");
        }
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = persisted;
        restored
    }

    /// Persist and cache a session. No validation: the API already issued
    /// the credential.
    pub fn login(&self, identity: &str, credential: SecretString, role: Role) {
        self.storage
            .store(StorageKey::Token, credential.expose_secret());
        self.storage.store(StorageKey::Email, identity);
        self.storage.store(StorageKey::Role, role.as_str());

        info!(email = %identity, role = %role, "Signed in");
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Session::new(identity, credential, role));
    }

    /// Forget the session, in memory and in storage.
    pub fn logout(&self) {
        self.storage.clear_session();
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Signed out");
    }

    /// Whether a session exists and storage still holds its credential.
    pub fn is_authenticated(&self) -> bool {
        self.sync().is_some()
    }

    /// Whether the effective role is [`Role::Admin`].
    pub fn is_admin(&self) -> bool {
        self.sync().is_some_and(|session| session.is_admin())
    }

    /// The effective session.
    pub fn current(&self) -> Option<Session> {
        self.sync()
    }

    /// Bring the cache in line with storage and return it.
    fn sync(&self) -> Option<Session> {
        let persisted = self.persisted();
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        let agrees = match (cache.as_ref(), persisted.as_ref()) {
            (Some(cached), Some(stored)) => cached.same_as(stored),
            (None, None) => true,
            _ => false,
        };
        if !agrees {
            match &persisted {
                Some(session) => debug!(email = %session.identity, "Session changed in storage; rebuilding"),
                None if cache.is_some() => debug!("Session cleared in storage; dropping cache"),
                None => {}
            }
            cache.clone_from(&persisted);
        }

        persisted
    }

    fn persisted(&self) -> Option<Session> {
        let credential = self.storage.token()?;
        // An empty email is still an identity; only a missing field is absence.
        let identity = self.storage.load(StorageKey::Email)?;
        let role = Role::from_lenient(self.storage.load(StorageKey::Role).as_deref());
        Some(Session::new(identity, SecretString::from(credential), role))
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.cache.read().ok().map(|c| c.clone()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionStore::new(storage.clone());
        (storage, session)
    }

    fn token(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_login_as_admin() {
        let (storage, sessions) = store();
        sessions.login("a@b.com", token("T1"), Role::Admin);

        assert!(sessions.is_authenticated());
        assert!(sessions.is_admin());
        assert_eq!(storage.token().as_deref(), Some("T1"));
        assert_eq!(storage.load(StorageKey::Email).as_deref(), Some("a@b.com"));
        assert_eq!(storage.load(StorageKey::Role).as_deref(), Some("ADMIN"));
    }

    #[test]
    fn test_logout_revokes_everything() {
        let (storage, sessions) = store();
        sessions.login("a@b.com", token("T1"), Role::Admin);
        sessions.logout();

        assert!(!sessions.is_authenticated());
        assert!(!sessions.is_admin());
        assert!(sessions.current().is_none());
        assert_eq!(storage.token(), None);
    }

    #[test]
    fn test_out_of_band_clear_is_a_logout() {
        let (storage, sessions) = store();
        sessions.login("a@b.com", token("T1"), Role::Customer);

        storage.clear_session();

        assert!(!sessions.is_authenticated());
        assert!(sessions.current().is_none());
    }

    #[test]
    fn test_restore_requires_token_and_email() {
        let (storage, sessions) = store();
        storage.store(StorageKey::Token, "T1");
        assert!(!sessions.restore());

        storage.store(StorageKey::Email, "a@b.com");
        assert!(sessions.restore());
        assert!(sessions.is_authenticated());
        // No persisted role reads as a customer.
        assert!(!sessions.is_admin());
    }

    #[test]
    fn test_login_with_blank_identity_is_authenticated() {
        let (storage, sessions) = store();
        sessions.login("", token("T1"), Role::Admin);

        assert_eq!(storage.token().as_deref(), Some("T1"));
        assert!(sessions.is_authenticated());
        assert!(sessions.is_admin());
        assert_eq!(sessions.current().unwrap().identity, "");
    }

    #[test]
    fn test_restore_is_idempotent() {
        let (storage, sessions) = store();
        storage.store(StorageKey::Token, "T1");
        storage.store(StorageKey::Email, "a@b.com");
        storage.store(StorageKey::Role, "ADMIN");

        assert!(sessions.restore());
        assert!(sessions.restore());
        assert!(sessions.is_admin());
        assert_eq!(storage.load(StorageKey::Role).as_deref(), Some("ADMIN"));
    }

    #[test]
    fn test_lowercase_persisted_role_is_not_admin() {
        let (storage, sessions) = store();
        storage.store(StorageKey::Token, "T1");
        storage.store(StorageKey::Email, "a@b.com");
        storage.store(StorageKey::Role, "admin");

        assert!(sessions.restore());
        assert!(!sessions.is_admin());
    }

    #[test]
    fn test_cache_follows_storage_changes() {
        let (storage, sessions) = store();
        sessions.login("a@b.com", token("T1"), Role::Customer);

        storage.store(StorageKey::Role, "ADMIN");
        storage.store(StorageKey::Token, "T2");

        let current = sessions.current().unwrap();
        assert!(current.is_admin());
        assert_eq!(current.credential().expose_secret(), "T2");
    }

    #[test]
    fn test_unknown_role_never_grants_admin() {
        let (storage, sessions) = store();
        sessions.login("a@b.com", token("T1"), Role::Customer);
        storage.store(StorageKey::Role, "SUPERUSER");
        assert!(sessions.is_authenticated());
        assert!(!sessions.is_admin());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let session = Session::new("a@b.com", token("super-secret"), Role::Admin);
        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
