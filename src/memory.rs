//! Process-wide session memory with per-entry time-to-live.
//!
//! Entries live only as long as the host process. The map itself is not
//! bounded: there is one entry per provider kind, and each history bounds
//! itself through its sliding window.

use crate::history::ConversationHistory;
use crate::log_debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default session lifetime (24 hours)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of "now" for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used outside tests
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Key/value store whose entries expire after a TTL
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

/// The session store for conversation transcripts
pub type SessionMemoryCache = MemoryCache<ConversationHistory>;

impl<V: Clone> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_SESSION_TTL)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `value` under `key` with the default TTL
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Replace the whole value and restart its TTL clock
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Copy of the value, or `None` once it has expired.
    ///
    /// Expired entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                log_debug!("Session entry '{}' expired", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
