//! Dual-index in-memory user store with last-access expiry.
//!
//! Two indices live behind a single `RwLock`:
//! - identifier -> entry (the cached `User` plus its last-access time)
//! - login -> identifier
//!
//! Every mutation touches both indices inside one write-lock critical
//! section, which keeps them consistent in both directions: each login
//! mapping points at an entry carrying that login, and each entry's login is
//! mapped back to it. Lookups only take the read lock. The last-access time
//! is an atomic so a hit can refresh it without upgrading the lock.
//!
//! Populating the cache after a backing-store read races with writes to the
//! same user. Each identifier hashes onto a write generation that every write
//! bumps; a reader snapshots it before going to the backing store and
//! [`CacheStore::put_if_unchanged`] refuses the insert if it has moved since.
//!
//! The store never awaits and never performs I/O while holding the lock.

use std::collections::HashMap;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::models::User;

/// Number of write-generation slots. Identifiers sharing a slot can refuse
/// each other's populates, which costs a cache miss and nothing else.
const GENERATION_SLOTS: usize = 64;

fn generation_slot(id: Uuid) -> usize {
    usize::from(id.as_bytes()[15]) % GENERATION_SLOTS
}

/// A cached user and the time it was last touched.
#[derive(Debug)]
struct CacheEntry {
    user: Arc<User>,
    /// Nanoseconds since the owning store's epoch.
    last_accessed: AtomicU64,
}

impl CacheEntry {
    fn new(user: User, now_nanos: u64) -> Self {
        Self {
            user: Arc::new(user),
            last_accessed: AtomicU64::new(now_nanos),
        }
    }

    fn touch(&self, now_nanos: u64) {
        self.last_accessed.fetch_max(now_nanos, Ordering::Relaxed);
    }

    fn last_accessed_nanos(&self) -> u64 {
        self.last_accessed.load(Ordering::Relaxed)
    }

    fn approx_size(&self) -> usize {
        size_of::<Uuid>()
            + size_of::<Self>()
            + size_of::<User>()
            + self.user.login.len()
            + self.user.password.len()
            + self.user.name.len()
    }
}

#[derive(Debug)]
struct Indices {
    by_id: HashMap<Uuid, CacheEntry>,
    by_login: HashMap<String, Uuid>,
    generations: [u64; GENERATION_SLOTS],
}

impl Default for Indices {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_login: HashMap::new(),
            generations: [0; GENERATION_SLOTS],
        }
    }
}

impl Indices {
    fn generation(&self, id: Uuid) -> u64 {
        self.generations[generation_slot(id)]
    }

    fn bump(&mut self, id: Uuid) -> u64 {
        let generation = &mut self.generations[generation_slot(id)];
        *generation = generation.wrapping_add(1);
        *generation
    }

    fn insert(&mut self, entry: CacheEntry) {
        let id = entry.user.id;
        let login = entry.user.login.clone();
        self.bump(id);

        if let Some(previous) = self.by_id.insert(id, entry) {
            if previous.user.login != login {
                self.release_login(&previous.user.login, id);
            }
        }
        if let Some(displaced) = self.by_login.insert(login, id) {
            if displaced != id {
                self.by_id.remove(&displaced);
            }
        }
    }

    /// Remove `login -> id` only if the mapping still belongs to `id`.
    fn release_login(&mut self, login: &str, id: Uuid) {
        if self.by_login.get(login) == Some(&id) {
            self.by_login.remove(login);
        }
    }

    fn remove(&mut self, id: Uuid) -> Option<CacheEntry> {
        let entry = self.by_id.remove(&id)?;
        self.release_login(&entry.user.login, id);
        Some(entry)
    }
}

/// Point-in-time counters for a [`CacheStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently cached.
    pub entries: usize,
    /// Lookups (by id or by login) answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries removed by expiry sweeps.
    pub expired: u64,
    /// Entries removed by explicit invalidation.
    pub invalidated: u64,
    /// Populates refused because a write to the same user overtook them.
    pub refused: u64,
    /// Rough footprint of the cached data in bytes.
    pub approx_bytes: usize,
}

/// Concurrent user cache keyed by identifier and by login.
#[derive(Debug)]
pub struct CacheStore {
    epoch: Instant,
    indices: RwLock<Indices>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    invalidated: AtomicU64,
    refused: AtomicU64,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            indices: RwLock::new(Indices::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            invalidated: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Indices> {
        self.indices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Indices> {
        self.indices.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn nanos_at(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    fn now_nanos(&self) -> u64 {
        self.nanos_at(Instant::now())
    }

    fn record(&self, found: bool) {
        let counter = if found { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Look up a user by identifier, refreshing its last-access time on a hit.
    pub fn get(&self, id: Uuid) -> Option<Arc<User>> {
        let now = self.now_nanos();
        let found = self.read().by_id.get(&id).map(|entry| {
            entry.touch(now);
            Arc::clone(&entry.user)
        });
        self.record(found.is_some());
        found
    }

    /// Look up a user by identifier without touching its last-access time.
    pub fn peek(&self, id: Uuid) -> Option<Arc<User>> {
        self.read().by_id.get(&id).map(|entry| Arc::clone(&entry.user))
    }

    /// Resolve a login to an identifier. Does not refresh any timestamp.
    pub fn get_id_by_login(&self, login: &str) -> Option<Uuid> {
        let found = self.read().by_login.get(login).copied();
        self.record(found.is_some());
        found
    }

    /// Insert or replace the entry for `user.id` and map its login to it.
    ///
    /// A login previously cached for the same identifier is released. An
    /// entry for a different identifier that still claimed this login is
    /// stale (logins are unique in the backing store) and is dropped.
    pub fn put(&self, user: User) {
        let entry = CacheEntry::new(user, self.now_nanos());
        self.write().insert(entry);
    }

    /// Current write generation for `id`. Take it before reading `id` from
    /// the backing store and pass it to [`put_if_unchanged`](Self::put_if_unchanged).
    pub fn generation(&self, id: Uuid) -> u64 {
        self.read().generation(id)
    }

    /// Record that a write to `id` is about to reach the backing store and
    /// return the new generation. Populates holding an older snapshot are
    /// refused from here on.
    pub fn begin_write(&self, id: Uuid) -> u64 {
        self.write().bump(id)
    }

    /// Like [`put`](Self::put), but only if no write to `user.id` happened
    /// since `generation` was observed. Returns whether the entry was stored.
    pub fn put_if_unchanged(&self, user: User, generation: u64) -> bool {
        let entry = CacheEntry::new(user, self.now_nanos());
        let mut indices = self.write();
        if indices.generation(entry.user.id) != generation {
            drop(indices);
            self.refused.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        indices.insert(entry);
        true
    }

    /// Remove the entry for `id` and its login mapping. Returns whether an
    /// entry was present. Counts as a write even when nothing was cached.
    pub fn invalidate(&self, id: Uuid) -> bool {
        let removed = {
            let mut indices = self.write();
            indices.bump(id);
            indices.remove(id).is_some()
        };
        if removed {
            self.invalidated.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Evict every entry whose last access plus `ttl` is strictly before
    /// `now`. Returns the number of evicted entries.
    pub fn sweep_expired(&self, ttl: Duration, now: Instant) -> usize {
        let ttl_nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        let now_nanos = self.nanos_at(now);

        let mut indices = self.write();
        let expired: Vec<Uuid> = indices
            .by_id
            .iter()
            .filter(|(_, entry)| entry.last_accessed_nanos().saturating_add(ttl_nanos) < now_nanos)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(entry) = indices.remove(*id) {
                tracing::trace!(user_id = %id, login = %entry.user.login, "evicted expired user");
            }
        }
        drop(indices);

        self.expired.fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let indices = self.read();
        let entry_bytes: usize = indices.by_id.values().map(CacheEntry::approx_size).sum();
        let login_bytes: usize = indices.by_login.keys().map(|login| login.len() + size_of::<Uuid>()).sum();

        CacheStats {
            entries: indices.by_id.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            approx_bytes: size_of::<Self>() + entry_bytes + login_bytes,
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let indices = self.read();
        for (login, id) in &indices.by_login {
            let entry = indices.by_id.get(id).expect("login mapped to a missing entry");
            assert_eq!(&entry.user.login, login);
        }
        for (id, entry) in &indices.by_id {
            assert_eq!(indices.by_login.get(&entry.user.login), Some(id));
        }
    }
}
