//! In-process installation token cache.
//!
//! Tokens are cached per installation with a fixed safety-margin TTL that
//! sits below GitHub's real token lifetime (60 minutes), so a cache hit is
//! never served past validity even under clock drift. Entries are evicted
//! explicitly when an installation is suspended or deleted.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Time source for cache expiry decisions. Injected so tests can drive a
/// manual clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

const TOKEN_CACHE_TTL_MINUTES: i64 = 50;

struct CacheEntry {
    token: String,
    expires_at: DateTime<Utc>,
}

/// TTL cache keyed by installation id. Never persisted.
pub struct TokenCache {
    entries: Mutex<HashMap<i64, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(TOKEN_CACHE_TTL_MINUTES),
            clock,
        }
    }

    /// Returns the cached token if present and not expired. Expired entries
    /// are dropped on access.
    pub fn get(&self, installation_id: i64) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(&installation_id) {
            Some(entry) if entry.expires_at > self.clock.now() => Some(entry.token.clone()),
            Some(_) => {
                entries.remove(&installation_id);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, installation_id: i64, token: String) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries
            .lock()
            .insert(installation_id, CacheEntry { token, expires_at });
    }

    /// Unconditionally evicts the entry. Returns whether one was present.
    pub fn remove(&self, installation_id: i64) -> bool {
        self.entries.lock().remove(&installation_id).is_some()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ManualClock;
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let cache = TokenCache::new(Arc::new(SystemClock));
        cache.put(42, "ghs_abc".to_string());
        assert_eq!(cache.get(42).as_deref(), Some("ghs_abc"));
    }

    #[test]
    fn miss_after_ttl_elapses() {
        let clock = Arc::new(ManualClock::new());
        let cache = TokenCache::new(clock.clone());
        cache.put(42, "ghs_abc".to_string());

        clock.advance(Duration::minutes(49));
        assert!(cache.get(42).is_some());

        clock.advance(Duration::minutes(2));
        assert!(cache.get(42).is_none());
        // The expired entry is gone, not just hidden
        assert!(!cache.remove(42));
    }

    #[test]
    fn remove_evicts_immediately() {
        let cache = TokenCache::new(Arc::new(SystemClock));
        cache.put(7, "ghs_live".to_string());
        assert!(cache.remove(7));
        assert!(cache.get(7).is_none());
        assert!(!cache.remove(7));
    }

    #[test]
    fn entries_are_independent_per_installation() {
        let cache = TokenCache::new(Arc::new(SystemClock));
        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());
        cache.remove(1);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(2).as_deref(), Some("two"));
    }
}
