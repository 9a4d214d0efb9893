//! Verdict cache keyed by the markup pair and the full configuration.
//!
//! Storage sits behind the async [`VerdictStore`] trait so a persistent
//! store can replace [`InMemoryStore`]. Every key lives in a caller-chosen
//! scope; the default scope is the empty string.

use crate::config::EquivalenceConfig;
use crate::verdict::Verdict;
use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Longer TTLs are clamped to this.
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Fingerprint of one `(expr1, expr2, config)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(pub u64);

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hash both markup strings and every configuration field.
///
/// The order of the two strings matters: `(a, b)` and `(b, a)` are different
/// keys. `FxHasher` is unseeded, so keys are stable across processes.
pub fn fingerprint(expr1: &str, expr2: &str, config: &EquivalenceConfig) -> CacheKey {
    let mut hasher = FxHasher::default();
    expr1.hash(&mut hasher);
    expr2.hash(&mut hasher);
    config.region.hash(&mut hasher);
    config.force_symbolic_only.hash(&mut hasher);
    config.float_tolerance.to_bits().hash(&mut hasher);
    config.symbolic_timeout_ms.hash(&mut hasher);
    config.max_canonicalization_iterations.hash(&mut hasher);
    config.cache_enabled.hash(&mut hasher);
    CacheKey(hasher.finish())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub verdict: Verdict,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(key: CacheKey, verdict: Verdict, ttl: Duration) -> Self {
        let created_at = Instant::now();
        Self {
            key,
            verdict,
            created_at,
            expires_at: created_at + ttl.min(MAX_TTL),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Backing storage for [`ResultCache`]. Operations are atomic per key.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn get(&self, scope: &str, key: CacheKey) -> Option<CacheEntry>;

    async fn put(&self, scope: &str, entry: CacheEntry);

    async fn delete(&self, scope: &str, key: CacheKey) -> bool;

    /// Drop every entry in `scope`. Returns how many were removed.
    async fn clear(&self, scope: &str) -> usize;

    /// Drop expired entries in every scope. Returns how many were removed.
    async fn evict_expired(&self, now: Instant) -> usize;

    async fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<FxHashMap<(String, CacheKey), CacheEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerdictStore for InMemoryStore {
    async fn get(&self, scope: &str, key: CacheKey) -> Option<CacheEntry> {
        self.entries
            .read()
            .await
            .get(&(scope.to_string(), key))
            .cloned()
    }

    async fn put(&self, scope: &str, entry: CacheEntry) {
        self.entries
            .write()
            .await
            .insert((scope.to_string(), entry.key), entry);
    }

    async fn delete(&self, scope: &str, key: CacheKey) -> bool {
        self.entries
            .write()
            .await
            .remove(&(scope.to_string(), key))
            .is_some()
    }

    async fn clear(&self, scope: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(s, _), _| s != scope);
        before - entries.len()
    }

    async fn evict_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// TTL-aware front over a [`VerdictStore`].
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn VerdictStore>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn VerdictStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached verdict for `key`. An expired entry is removed and reported as
    /// a miss.
    pub async fn get(&self, scope: &str, key: CacheKey) -> Option<Verdict> {
        let entry = self.store.get(scope, key).await?;
        if entry.is_expired(Instant::now()) {
            tracing::debug!(target: "cache", scope, key = %key, "entry_expired");
            self.store.delete(scope, key).await;
            return None;
        }
        Some(entry.verdict)
    }

    pub async fn put(&self, scope: &str, key: CacheKey, verdict: Verdict) {
        self.put_with_ttl(scope, key, verdict, self.ttl).await;
    }

    pub async fn put_with_ttl(&self, scope: &str, key: CacheKey, verdict: Verdict, ttl: Duration) {
        self.store
            .put(scope, CacheEntry::new(key, verdict, ttl))
            .await;
    }

    pub async fn delete(&self, scope: &str, key: CacheKey) -> bool {
        self.store.delete(scope, key).await
    }

    pub async fn clear(&self, scope: &str) -> usize {
        self.store.clear(scope).await
    }

    pub async fn evict_expired(&self) -> usize {
        let removed = self.store.evict_expired(Instant::now()).await;
        if removed > 0 {
            tracing::debug!(target: "cache", removed, "expired_entries_evicted");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
