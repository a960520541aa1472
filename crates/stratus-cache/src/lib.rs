use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single cached upstream payload.
///
/// The payload is opaque bytes (the upstream JSON document, verbatim) and is
/// never mutated in place — a fresh fetch fully replaces the entry.
#[derive(Clone, Debug)]
struct CacheEntry {
    payload: Bytes,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.fetched_at) < ttl
    }
}

/// TTL-bounded response cache keyed by exact coordinate strings.
///
/// Keys are the literal query-string values joined as `"{lat},{lon}"`.
/// Byte-identical strings share an entry; `"40"` and `"40.0"` are distinct
/// keys on purpose — normalizing would change hit rates observed by clients.
///
/// Eviction is lazy only: a stale entry is discovered and removed on the
/// lookup that finds it. There is no background sweep, so the map grows
/// unbounded under high key cardinality (acceptable at the intended traffic
/// scale; a capacity caveat for anything bigger).
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a key. Returns the payload only if the entry is younger than
    /// the TTL; a stale entry is removed as a side effect and `None` returned.
    pub fn lookup(&self, key: &str) -> Option<Bytes> {
        self.lookup_at(key, Instant::now())
    }

    fn lookup_at(&self, key: &str, now: Instant) -> Option<Bytes> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite the entry for `key` unconditionally.
    pub fn store(&self, key: String, payload: Bytes, now: Instant) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            CacheEntry {
                payload,
                fetched_at: now,
            },
        );
    }

    /// Number of entries currently held, including any not-yet-purged stale
    /// ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
