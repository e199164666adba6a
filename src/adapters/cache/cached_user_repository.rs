//! Read-through, write-through cache decorator for `UserRepository`.
//!
//! Wraps any `UserRepository` with a [`CacheStore`] and a [`Janitor`] that
//! expires entries idle for longer than the configured TTL. Reads by id are
//! served from the cache and populate it on a miss. Login lookups consult
//! the cache but do not populate it. Writes go to the wrapped store first;
//! the cache only follows once the store has accepted the change.
//!
//! A populate is dropped when a write to the same user started after the
//! read did, so a slow read can never put a record older than the last
//! acknowledged write back into the cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::janitor::{Janitor, JanitorStatus};
use super::store::{CacheStats, CacheStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CacheConfig, UpdateUserRequest, User};
use crate::domain::ports::UserRepository;

/// Cached user repository decorator.
pub struct CachedUserRepository<R: UserRepository> {
    inner: Arc<R>,
    store: Arc<CacheStore>,
    janitor: Janitor,
    config: CacheConfig,
    closed: AtomicBool,
}

impl<R: UserRepository> CachedUserRepository<R> {
    /// Wrap `inner` and start the expiry janitor.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// `InvalidConfiguration` if the TTL or the cleanup interval is zero.
    pub fn new(inner: Arc<R>, config: CacheConfig) -> DomainResult<Self> {
        if config.ttl().is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "cache ttl must be greater than zero".to_string(),
            ));
        }
        if config.cleanup_interval().is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "cache cleanup interval must be greater than zero".to_string(),
            ));
        }
        if config.cleanup_interval() > config.ttl() {
            tracing::warn!(
                ttl_ms = config.ttl_ms,
                cleanup_interval_ms = config.cleanup_interval_ms,
                "cache cleanup interval exceeds ttl; entries may outlive ttl by up to one interval"
            );
        }

        let store = Arc::new(CacheStore::new());
        let janitor = Janitor::spawn(Arc::clone(&store), config.ttl(), config.cleanup_interval());

        tracing::info!(
            ttl_ms = config.ttl_ms,
            cleanup_interval_ms = config.cleanup_interval_ms,
            "user cache enabled"
        );

        Ok(Self {
            inner,
            store,
            janitor,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Direct access to the cache, for diagnostics and tests.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn janitor_status(&self) -> JanitorStatus {
        self.janitor.status()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn log_store_error(operation: &'static str, err: &DomainError) {
    if err.is_not_found() {
        tracing::debug!(operation, error = %err, "user store lookup came back empty");
    } else {
        tracing::warn!(operation, error = %err, "user store operation failed");
    }
}

#[async_trait]
impl<R: UserRepository + 'static> UserRepository for CachedUserRepository<R> {
    async fn get_user(&self, id: Uuid) -> DomainResult<User> {
        if let Some(cached) = self.store.get(id) {
            tracing::trace!(user_id = %id, "user cache hit");
            return Ok((*cached).clone());
        }

        let generation = self.store.generation(id);
        let user = self
            .inner
            .get_user(id)
            .await
            .inspect_err(|e| log_store_error("get_user", e))?;

        if self.store.put_if_unchanged(user.clone(), generation) {
            tracing::trace!(user_id = %id, "user cache populated");
        } else {
            tracing::debug!(user_id = %id, "user written during read; not caching");
        }
        Ok(user)
    }

    async fn get_user_id_by_login(&self, login: &str) -> DomainResult<Uuid> {
        if let Some(id) = self.store.get_id_by_login(login) {
            tracing::trace!(login, user_id = %id, "login cache hit");
            return Ok(id);
        }

        self.inner
            .get_user_id_by_login(login)
            .await
            .inspect_err(|e| log_store_error("get_user_id_by_login", e))
    }

    async fn add_user(&self, user: &User) -> DomainResult<()> {
        self.inner
            .add_user(user)
            .await
            .inspect_err(|e| log_store_error("add_user", e))
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> DomainResult<Uuid> {
        let generation = self.store.begin_write(request.id);
        let id = self
            .inner
            .update_user(request)
            .await
            .inspect_err(|e| log_store_error("update_user", e))?;

        match self.inner.get_user(id).await {
            Ok(user) => {
                if !self.store.put_if_unchanged(user, generation) {
                    // Another write to this user landed first; its result may be older than ours.
                    self.store.invalidate(id);
                }
                Ok(id)
            }
            Err(err) => {
                // The cached copy may predate the update.
                self.store.invalidate(id);
                log_store_error("update_user", &err);
                Err(err)
            }
        }
    }

    async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        if self.store.invalidate(id) {
            tracing::debug!(user_id = %id, "evicted user ahead of delete");
        }

        self.inner
            .delete_user(id)
            .await
            .inspect_err(|e| log_store_error("delete_user", e))?;

        // A concurrent read may have repopulated the entry while the delete was in flight.
        self.store.invalidate(id);
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("cached user repository already closed");
            return;
        }

        self.janitor.stop().await;
        self.inner.close().await;
        tracing::info!(entries = self.store.len(), "cached user repository closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteUserRepository};
    use std::time::Duration;

    async fn setup() -> CachedUserRepository<SqliteUserRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let inner = Arc::new(SqliteUserRepository::new(pool));
        CachedUserRepository::new(inner, CacheConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_zero_ttl() {
        let pool = create_migrated_test_pool().await.unwrap();
        let inner = Arc::new(SqliteUserRepository::new(pool));

        let config = CacheConfig::new(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(
            CachedUserRepository::new(Arc::clone(&inner), config),
            Err(DomainError::InvalidConfiguration(_))
        ));

        let config = CacheConfig::new(Duration::from_secs(1), Duration::ZERO);
        assert!(matches!(
            CachedUserRepository::new(inner, config),
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_get_populates_cache() {
        let repo = setup().await;
        let user = User::new("admin", "secret", "lema").with_age(19);
        repo.add_user(&user).await.unwrap();
        assert!(repo.store().is_empty());

        let fetched = repo.get_user(user.id).await.unwrap();
        assert_eq!(fetched, repo.inner().get_user(user.id).await.unwrap());
        assert_eq!(repo.store().get_id_by_login("admin"), Some(user.id));

        repo.close().await;
    }

    #[tokio::test]
    async fn test_update_refreshes_cached_login() {
        let repo = setup().await;
        let user = User::new("old", "secret", "lema");
        repo.add_user(&user).await.unwrap();
        repo.get_user(user.id).await.unwrap();

        repo.update_user(&UpdateUserRequest::new(user.id).login("new")).await.unwrap();

        assert_eq!(repo.get_user_id_by_login("new").await.unwrap(), user.id);
        assert!(repo.store().get_id_by_login("old").is_none());
        assert!(matches!(
            repo.get_user_id_by_login("old").await,
            Err(DomainError::LoginNotFound(_))
        ));

        repo.close().await;
    }

    #[tokio::test]
    async fn test_delete_evicts_entry() {
        let repo = setup().await;
        let user = User::new("admin", "secret", "lema");
        repo.add_user(&user).await.unwrap();
        repo.get_user(user.id).await.unwrap();

        repo.delete_user(user.id).await.unwrap();
        assert!(repo.store().peek(user.id).is_none());
        assert!(matches!(repo.get_user(user.id).await, Err(DomainError::UserNotFound(_))));

        repo.close().await;
    }

    #[tokio::test]
    async fn test_close_twice() {
        let repo = setup().await;
        repo.close().await;
        repo.close().await;

        assert!(repo.is_closed());
        assert!(!repo.janitor_status().running);
        assert!(repo.inner().pool().is_closed());
    }
}
