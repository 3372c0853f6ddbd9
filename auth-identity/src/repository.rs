use crate::models::Identity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use error_common::{AuthError, Result};
use uuid::Uuid;

/// Persistent identity store consumed by the auth core.
///
/// Implementations surface backend faults as [`AuthError::StoreUnavailable`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn insert(&self, identity: Identity) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Identity>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;
    /// Overwrite any previous secret with a pending (not yet enabled) one
    async fn store_pending_mfa(&self, id: Uuid, secret: &str, backup_code_hashes: Vec<String>) -> Result<()>;
    /// Enable MFA only if the stored secret is still `expected_secret`,
    /// returning whether the flag was set
    async fn enable_mfa(&self, id: Uuid, expected_secret: &str) -> Result<bool>;
    async fn clear_mfa(&self, id: Uuid) -> Result<()>;
    /// Remove one backup code hash, returning whether it was present
    async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> Result<bool>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<()>;
}

// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: DashMap<Uuid, Identity>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_identity<T>(&self, id: Uuid, f: impl FnOnce(&mut Identity) -> T) -> Result<T> {
        let mut entry = self
            .identities
            .get_mut(&id)
            .ok_or_else(|| AuthError::StoreUnavailable(format!("identity {id} not found")))?;
        Ok(f(entry.value_mut()))
    }

    fn find_where(&self, predicate: impl Fn(&Identity) -> bool) -> Option<Identity> {
        self.identities
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn insert(&self, identity: Identity) -> Result<()> {
        self.identities.insert(identity.id, identity);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        Ok(self.identities.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Identity>> {
        Ok(self.find_where(|identity| identity.phone == phone))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        Ok(self.find_where(|identity| {
            identity
                .email
                .as_deref()
                .is_some_and(|stored| stored.eq_ignore_ascii_case(email))
        }))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        self.with_identity(id, |identity| identity.password_hash = password_hash.to_string())
    }

    async fn store_pending_mfa(&self, id: Uuid, secret: &str, backup_code_hashes: Vec<String>) -> Result<()> {
        self.with_identity(id, |identity| {
            identity.mfa_secret = Some(secret.to_string());
            identity.mfa_enabled = false;
            identity.backup_code_hashes = backup_code_hashes;
        })
    }

    async fn enable_mfa(&self, id: Uuid, expected_secret: &str) -> Result<bool> {
        self.with_identity(id, |identity| {
            if identity.mfa_secret.as_deref() != Some(expected_secret) {
                return false;
            }
            identity.mfa_enabled = true;
            true
        })
    }

    async fn clear_mfa(&self, id: Uuid) -> Result<()> {
        self.with_identity(id, |identity| {
            identity.mfa_secret = None;
            identity.mfa_enabled = false;
            identity.backup_code_hashes.clear();
        })
    }

    async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> Result<bool> {
        self.with_identity(id, |identity| {
            let before = identity.backup_code_hashes.len();
            identity.backup_code_hashes.retain(|stored| stored != code_hash);
            identity.backup_code_hashes.len() < before
        })
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_identity(id, |identity| identity.last_login = Some(at))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        self.with_identity(id, |identity| identity.is_active = active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_rbac::Role;

    #[tokio::test]
    async fn test_lookup_by_phone_and_email() {
        let store = InMemoryIdentityStore::new();
        let identity = Identity::new(Role::Guardian, "+8801711111111", "hash").with_email("Rahim@Example.com");
        let id = identity.id;
        store.insert(identity).await.unwrap();

        assert_eq!(store.find_by_phone("+8801711111111").await.unwrap().map(|i| i.id), Some(id));
        assert_eq!(store.find_by_email("rahim@example.com").await.unwrap().map(|i| i.id), Some(id));
        assert!(store.find_by_phone("+8801799999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_mfa_overwrites_previous_secret() {
        let store = InMemoryIdentityStore::new();
        let identity = Identity::new(Role::Agency, "+8801722222222", "hash");
        let id = identity.id;
        store.insert(identity).await.unwrap();

        store.store_pending_mfa(id, "FIRST", vec!["a".into()]).await.unwrap();
        assert!(store.enable_mfa(id, "FIRST").await.unwrap());
        store.store_pending_mfa(id, "SECOND", vec!["b".into()]).await.unwrap();

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.mfa_secret.as_deref(), Some("SECOND"));
        assert!(!stored.mfa_enabled);
        assert_eq!(stored.backup_code_hashes, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_enable_mfa_requires_matching_secret() {
        let store = InMemoryIdentityStore::new();
        let identity = Identity::new(Role::Moderator, "+8801744444444", "hash");
        let id = identity.id;
        store.insert(identity).await.unwrap();
        store.store_pending_mfa(id, "CURRENT", Vec::new()).await.unwrap();

        assert!(!store.enable_mfa(id, "STALE").await.unwrap());
        assert!(!store.find_by_id(id).await.unwrap().unwrap().mfa_enabled);

        assert!(store.enable_mfa(id, "CURRENT").await.unwrap());
        assert!(store.find_by_id(id).await.unwrap().unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn test_consume_backup_code_is_single_use() {
        let store = InMemoryIdentityStore::new();
        let identity = Identity::new(Role::Admin, "+8801733333333", "hash");
        let id = identity.id;
        store.insert(identity).await.unwrap();
        store.store_pending_mfa(id, "S", vec!["h1".into(), "h2".into()]).await.unwrap();

        assert!(store.consume_backup_code(id, "h1").await.unwrap());
        assert!(!store.consume_backup_code(id, "h1").await.unwrap());
        assert!(store.consume_backup_code(id, "h2").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_unknown_identity_is_a_store_error() {
        let store = InMemoryIdentityStore::new();
        let err = store.enable_mfa(Uuid::new_v4(), "S").await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }
}
