//! Expiring in-memory key-value store.
//!
//! Backs both the generation result cache (24 h TTL) and the per-guest-IP
//! quota counters (expiring at end of day). Entries are pruned lazily on
//! access; no background eviction task is needed at this scale. The store
//! offers no consistency guarantee beyond "eventually expires"; it is an
//! optimization, never authoritative state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;

use ladle_core::types::Timestamp;

use crate::clock::Clock;

struct Entry<V> {
    value: V,
    expires_at: Timestamp,
}

/// A mutex-guarded map with per-entry expiry.
pub struct TtlStore<V> {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlStore<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a live value. Expired entries are removed and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value that expires `ttl` from now.
    pub fn insert(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.insert_until(key, value, expires_at);
    }

    /// Store a value with an absolute expiry instant.
    pub fn insert_until(&self, key: &str, value: V, expires_at: Timestamp) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), Entry { value, expires_at });
    }
}

impl TtlStore<i64> {
    /// Read-then-write counter increment, keeping the entry's expiry.
    ///
    /// Deliberately not compare-and-swap: concurrent increments of the same
    /// key can race past a nominal limit by a small margin, which the quota
    /// gate accepts.
    pub fn increment_until(&self, key: &str, expires_at: Timestamp) -> i64 {
        let current = self.get(key).unwrap_or(0);
        let next = current + 1;
        self.insert_until(key, next, expires_at);
        next
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn fixture() -> (ManualClock, TtlStore<String>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
        let store = TtlStore::new(Arc::new(clock.clone()));
        (clock, store)
    }

    #[test]
    fn stored_value_is_readable_before_expiry() {
        let (_clock, store) = fixture();
        store.insert("k", "v".to_string(), Duration::hours(24));
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn value_disappears_after_ttl() {
        let (clock, store) = fixture();
        store.insert("k", "v".to_string(), Duration::hours(24));
        clock.advance(Duration::hours(24) + Duration::seconds(1));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn value_survives_until_just_before_expiry() {
        let (clock, store) = fixture();
        store.insert("k", "v".to_string(), Duration::hours(24));
        clock.advance(Duration::hours(23) + Duration::minutes(59));
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn missing_key_is_none() {
        let (_clock, store) = fixture();
        assert_eq!(store.get("absent"), None);
    }

    #[test]
    fn counter_increments_from_zero() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
        let counters: TtlStore<i64> = TtlStore::new(Arc::new(clock.clone()));
        let expires = Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 0).unwrap();

        assert_eq!(counters.increment_until("guest", expires), 1);
        assert_eq!(counters.increment_until("guest", expires), 2);
        assert_eq!(counters.get("guest"), Some(2));
    }

    #[test]
    fn counter_resets_after_expiry() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
        let counters: TtlStore<i64> = TtlStore::new(Arc::new(clock.clone()));
        let expires = Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 0).unwrap();

        counters.increment_until("guest", expires);
        counters.increment_until("guest", expires);
        clock.set(Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 1).unwrap());

        assert_eq!(counters.get("guest"), None);
        assert_eq!(
            counters.increment_until("guest", Utc.with_ymd_and_hms(2026, 6, 3, 0, 0, 0).unwrap()),
            1,
        );
    }
}
