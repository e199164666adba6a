//! Common test utilities for integration tests
//!
//! Provides an in-memory `UserRepository` that counts calls and can be told
//! to fail, so cache behavior can be observed from the outside.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use lk_api::adapters::cache::CachedUserRepository;
use lk_api::domain::models::{CacheConfig, UpdateUserRequest, User};
use lk_api::{DomainError, DomainResult, UserRepository};

#[derive(Debug, Default)]
pub struct CallCounts {
    pub get_user: AtomicUsize,
    pub get_user_id_by_login: AtomicUsize,
    pub add_user: AtomicUsize,
    pub update_user: AtomicUsize,
    pub delete_user: AtomicUsize,
    pub close: AtomicUsize,
}

impl CallCounts {
    pub fn get_user(&self) -> usize {
        self.get_user.load(Ordering::SeqCst)
    }

    pub fn get_user_id_by_login(&self) -> usize {
        self.get_user_id_by_login.load(Ordering::SeqCst)
    }

    pub fn close(&self) -> usize {
        self.close.load(Ordering::SeqCst)
    }
}

/// In-memory user store with call counters and injectable failures.
#[derive(Debug, Default)]
pub struct StubUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
    pub calls: CallCounts,
    fail_gets: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    held_get: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

/// Handle on a `get_user` call parked by [`StubUserRepository::hold_next_get`].
pub struct HeldGet {
    /// Resolves once the held call has read the store.
    pub reached: oneshot::Receiver<()>,
    /// Send to let the held call return what it read.
    pub release: oneshot::Sender<()>,
}

fn injected() -> DomainError {
    DomainError::DatabaseError("injected failure".to_string())
}

impl StubUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write straight into the store, bypassing any cache in front of it.
    pub fn put_direct(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Park the next `get_user` after it has read the store, until released.
    pub fn hold_next_get(&self) -> HeldGet {
        let (reached_tx, reached) = oneshot::channel();
        let (release, release_rx) = oneshot::channel();
        *self.held_get.lock().unwrap() = Some((reached_tx, release_rx));
        HeldGet { reached, release }
    }
}

#[async_trait]
impl UserRepository for StubUserRepository {
    async fn get_user(&self, id: Uuid) -> DomainResult<User> {
        self.calls.get_user.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let result = self
            .users
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DomainError::UserNotFound(id));

        let held = self.held_get.lock().unwrap().take();
        if let Some((reached, release)) = held {
            let _ = reached.send(());
            let _ = release.await;
        }
        result
    }

    async fn get_user_id_by_login(&self, login: &str) -> DomainResult<Uuid> {
        self.calls.get_user_id_by_login.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.login == login)
            .map(|u| u.id)
            .ok_or_else(|| DomainError::LoginNotFound(login.to_string()))
    }

    async fn add_user(&self, user: &User) -> DomainResult<()> {
        self.calls.add_user.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.login == user.login) {
            return Err(DomainError::LoginTaken(user.login.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> DomainResult<Uuid> {
        self.calls.update_user.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }

        let mut users = self.users.lock().unwrap();
        if let Some(login) = &request.login {
            if users.values().any(|u| &u.login == login && u.id != request.id) {
                return Err(DomainError::LoginTaken(login.clone()));
            }
        }

        let user = users.get_mut(&request.id).ok_or(DomainError::UserNotFound(request.id))?;
        if let Some(login) = &request.login {
            user.login = login.clone();
        }
        if let Some(password) = &request.password {
            user.password = password.clone();
        }
        if let Some(name) = &request.name {
            user.name = name.clone();
        }
        if let Some(age) = request.age {
            user.age = age;
        }
        user.updated_at = Utc::now();
        Ok(request.id)
    }

    async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        self.calls.delete_user.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.users
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::UserNotFound(id))
    }

    async fn close(&self) {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
    }
}

/// A stub store wrapped in the cache decorator.
pub fn cached_stub(
    ttl: Duration,
    cleanup_interval: Duration,
) -> (Arc<StubUserRepository>, CachedUserRepository<StubUserRepository>) {
    let stub = Arc::new(StubUserRepository::new());
    let cached = CachedUserRepository::new(Arc::clone(&stub), CacheConfig::new(ttl, cleanup_interval))
        .expect("valid cache configuration");
    (stub, cached)
}

/// Cache settings long enough that nothing expires during a test.
pub fn long_lived() -> (Arc<StubUserRepository>, CachedUserRepository<StubUserRepository>) {
    cached_stub(Duration::from_secs(60), Duration::from_secs(30))
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
