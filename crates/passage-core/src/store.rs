//! Session store over an injectable storage port.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::Result;
use crate::tokens::{
    AccessToken, DEFAULT_TOKEN_TYPE, RefreshToken, TokenSet, TokenUpdate, authorization_value,
};
use crate::traits::ClientStorage;

/// Storage keys (and cookie names) for the three session entries.
///
/// Every reader and writer of session state goes through one namespace;
/// client storage and relay cookies share the same names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    pub access_token: &'static str,
    pub refresh_token: &'static str,
    pub token_type: &'static str,
}

impl SessionKeys {
    /// The canonical session namespace.
    pub const CANONICAL: SessionKeys = SessionKeys {
        access_token: "passage_access_token",
        refresh_token: "passage_refresh_token",
        token_type: "passage_token_type",
    };

    /// All three keys.
    pub fn all(&self) -> [&'static str; 3] {
        [self.access_token, self.refresh_token, self.token_type]
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Holds the current token set.
///
/// Reads and writes are serialized through a read/write lock, so a refresh
/// writing new tokens never interleaves with a reader and no caller sees a
/// half-old, half-new token set. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    storage: Arc<dyn ClientStorage>,
    keys: SessionKeys,
    guard: RwLock<()>,
}

impl SessionStore {
    /// Create a store over the given storage with the canonical keys.
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self::with_keys(storage, SessionKeys::CANONICAL)
    }

    /// Create a store with explicit keys.
    pub fn with_keys(storage: Arc<dyn ClientStorage>, keys: SessionKeys) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                storage,
                keys,
                guard: RwLock::new(()),
            }),
        }
    }

    /// A store backed by fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Returns the keys this store uses.
    pub fn keys(&self) -> SessionKeys {
        self.inner.keys
    }

    /// Read the current token set.
    ///
    /// Returns `None` unless both tokens are present. A missing token type
    /// reads as `Bearer`.
    pub async fn read(&self) -> Result<Option<TokenSet>> {
        let _guard = self.inner.guard.read().await;
        self.read_unlocked().await
    }

    async fn read_unlocked(&self) -> Result<Option<TokenSet>> {
        let keys = &self.inner.keys;
        let storage = &self.inner.storage;

        let access = storage.get(keys.access_token).await?;
        let refresh = storage.get(keys.refresh_token).await?;
        let token_type = storage.get(keys.token_type).await?;

        match (access, refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(Some(TokenSet {
                    access_token: AccessToken::new(access),
                    refresh_token: RefreshToken::new(refresh),
                    token_type: token_type
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
                }))
            }
            _ => Ok(None),
        }
    }

    /// Write a complete or partial token set. Absent fields keep their
    /// stored value.
    pub async fn write(&self, update: impl Into<TokenUpdate>) -> Result<()> {
        let update = update.into();
        let keys = &self.inner.keys;
        let storage = &self.inner.storage;

        let _guard = self.inner.guard.write().await;

        if let Some(access) = &update.access_token {
            storage.set(keys.access_token, access.as_str()).await?;
        }
        if let Some(refresh) = &update.refresh_token {
            storage.set(keys.refresh_token, refresh.as_str()).await?;
        }
        if let Some(token_type) = &update.token_type {
            storage.set(keys.token_type, token_type.trim()).await?;
        }

        debug!(
            access = update.access_token.is_some(),
            refresh = update.refresh_token.is_some(),
            token_type = update.token_type.is_some(),
            "Session tokens written"
        );
        Ok(())
    }

    /// Remove all three entries.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.inner.guard.write().await;
        for key in self.inner.keys.all() {
            self.inner.storage.remove(key).await?;
        }
        debug!("Session cleared");
        Ok(())
    }

    /// Read just the refresh token.
    pub async fn refresh_token(&self) -> Result<Option<RefreshToken>> {
        let _guard = self.inner.guard.read().await;
        Ok(self
            .inner
            .storage
            .get(self.inner.keys.refresh_token)
            .await?
            .filter(|t| !t.is_empty())
            .map(RefreshToken::new))
    }

    /// The `Authorization` value for the stored access token, if any.
    pub async fn authorization(&self) -> Result<Option<String>> {
        let _guard = self.inner.guard.read().await;
        let keys = &self.inner.keys;
        let access = self.inner.storage.get(keys.access_token).await?;
        let Some(access) = access.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let token_type = self
            .inner
            .storage
            .get(keys.token_type)
            .await?
            .unwrap_or_default();
        Ok(Some(authorization_value(&token_type, &access)))
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("keys", &self.inner.keys)
            .finish_non_exhaustive()
    }
}

/// In-memory [`ClientStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ClientStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_reads_none() {
        let store = SessionStore::in_memory();
        assert!(store.read().await.unwrap().is_none());
        assert!(store.refresh_token().await.unwrap().is_none());
        assert!(store.authorization().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read() {
        let store = SessionStore::in_memory();
        store
            .write(TokenSet::new("access", "refresh", "Bearer"))
            .await
            .unwrap();

        let tokens = store.read().await.unwrap().unwrap();
        assert_eq!(tokens.access_token.as_str(), "access");
        assert_eq!(tokens.refresh_token.as_str(), "refresh");
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(
            store.authorization().await.unwrap().as_deref(),
            Some("Bearer access")
        );
    }

    #[tokio::test]
    async fn entries_use_canonical_key_names() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.write(TokenSet::new("a", "r", "Bearer")).await.unwrap();

        assert_eq!(
            storage.get("passage_access_token").await.unwrap().as_deref(),
            Some("a")
        );
        assert_eq!(
            storage.get("passage_refresh_token").await.unwrap().as_deref(),
            Some("r")
        );
        assert_eq!(
            storage.get("passage_token_type").await.unwrap().as_deref(),
            Some("Bearer")
        );
    }

    #[tokio::test]
    async fn partial_write_preserves_missing_fields() {
        let store = SessionStore::in_memory();
        store
            .write(TokenSet::new("old-access", "old-refresh", "Bearer"))
            .await
            .unwrap();

        store
            .write(TokenUpdate {
                access_token: Some(AccessToken::new("new-access")),
                ..TokenUpdate::default()
            })
            .await
            .unwrap();

        let tokens = store.read().await.unwrap().unwrap();
        assert_eq!(tokens.access_token.as_str(), "new-access");
        assert_eq!(tokens.refresh_token.as_str(), "old-refresh");
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[tokio::test]
    async fn clear_removes_all_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store
            .write(TokenSet::new("a", "r", "Bearer"))
            .await
            .unwrap();
        assert_eq!(storage.len().await, 3);

        store.clear().await.unwrap();
        assert!(storage.is_empty().await);
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_token_type_defaults_to_bearer() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(SessionKeys::CANONICAL.access_token, "a")
            .await
            .unwrap();
        storage
            .set(SessionKeys::CANONICAL.refresh_token, "r")
            .await
            .unwrap();
        let store = SessionStore::new(storage);
        assert_eq!(store.read().await.unwrap().unwrap().token_type, "Bearer");
    }

    #[tokio::test]
    async fn concurrent_writes_never_tear() {
        let store = SessionStore::in_memory();
        store
            .write(TokenSet::new("a0", "r0", "Bearer"))
            .await
            .unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 1..50 {
                    store
                        .write(TokenSet::new(format!("a{i}"), format!("r{i}"), "Bearer"))
                        .await
                        .unwrap();
                }
            })
        };

        for _ in 0..50 {
            let tokens = store.read().await.unwrap().unwrap();
            let a = tokens.access_token.as_str().trim_start_matches('a');
            let r = tokens.refresh_token.as_str().trim_start_matches('r');
            assert_eq!(a, r);
        }

        writer.await.unwrap();
    }
}
