use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use apigate_core::TaggedValue;
use tokio::sync::Notify;

use crate::error::ExecutionError;

/// Which resource a cached result belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    Stored(i64),
    Unsaved(String),
}

/// `(resource slot, request fingerprint)`.
pub type CacheKey = (CacheSlot, String);

/// Process-wide TTL cache of resource results.
///
/// Concurrent misses on one key coordinate: the first caller computes, the
/// others wait for it and then re-read the cache. Only completed successes
/// are stored, so readers never observe a partial entry.
pub struct ResultCache {
    max_entries: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    cache: HashMap<CacheKey, CacheEntry>,
    inflight: HashMap<CacheKey, Arc<Notify>>,
}

struct CacheEntry {
    value: TaggedValue,
    expires_at: Instant,
    last_accessed: Instant,
}

/// Whether a value came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Computed,
}

impl ResultCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<(TaggedValue, Lookup), ExecutionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TaggedValue, ExecutionError>>,
    {
        loop {
            let notify = {
                let mut s = self.lock();
                let now = Instant::now();
                if let Some(entry) = s.cache.get_mut(&key) {
                    if now < entry.expires_at {
                        entry.last_accessed = now;
                        return Ok((entry.value.clone(), Lookup::Hit));
                    }
                }
                match s.inflight.get(&key) {
                    Some(n) => n.clone(),
                    None => {
                        s.inflight.insert(key.clone(), Arc::new(Notify::new()));
                        break;
                    }
                }
            };
            // Register before re-checking so a completion between the two is not missed.
            let mut notified = std::pin::pin!(notify.notified());
            notified.as_mut().enable();
            if !self.lock().inflight.contains_key(&key) {
                continue;
            }
            notified.await;
        }

        let guard = InflightGuard { cache: self, key: &key };
        let result = compute().await;
        if let Ok(value) = &result {
            let now = Instant::now();
            let mut s = self.lock();
            s.cache.insert(
                key.clone(),
                CacheEntry {
                    value: value.clone(),
                    expires_at: now + ttl,
                    last_accessed: now,
                },
            );
            enforce_capacity(&mut s, self.max_entries, now);
        }
        drop(guard);
        result.map(|v| (v, Lookup::Computed))
    }
}

/// Clears the in-flight marker and wakes waiters, including when the
/// computing future is dropped part way.
struct InflightGuard<'a> {
    cache: &'a ResultCache,
    key: &'a CacheKey,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if let Some(n) = self.cache.lock().inflight.remove(self.key) {
            n.notify_waiters();
        }
    }
}

fn enforce_capacity(s: &mut State, max_entries: usize, now: Instant) {
    if s.cache.len() <= max_entries {
        return;
    }
    s.cache.retain(|_, e| e.expires_at > now);
    while s.cache.len() > max_entries {
        let oldest = s
            .cache
            .iter()
            .min_by_key(|(_, e)| e.last_accessed)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(k) => {
                s.cache.remove(&k);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ErrorKind;

    #[tokio::test]
    async fn second_lookup_hits() {
        let cache = ResultCache::new(8);
        let calls = AtomicUsize::new(0);
        for expected in [Lookup::Computed, Lookup::Hit] {
            let (v, lookup) = cache
                .get_or_compute((CacheSlot::Stored(1), "k".into()), Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(TaggedValue::text("v"))
                })
                .await
                .unwrap();
            assert_eq!(v, TaggedValue::text("v"));
            assert_eq!(lookup, expected);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ResultCache::new(8);
        let err = cache
            .get_or_compute((CacheSlot::Stored(1), "k".into()), Duration::from_secs(60), || async {
                Err(ExecutionError::new(ErrorKind::UpstreamFailure, "down"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamFailure);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = ResultCache::new(2);
        for k in ["a", "b", "c"] {
            cache
                .get_or_compute((CacheSlot::Stored(1), k.into()), Duration::from_secs(60), || async {
                    Ok(TaggedValue::text(k))
                })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_compute_once() {
        let cache = Arc::new(ResultCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute((CacheSlot::Stored(7), "same".into()), Duration::from_secs(60), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(TaggedValue::Integer(42))
                    })
                    .await
                    .unwrap()
                    .0
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), TaggedValue::Integer(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
