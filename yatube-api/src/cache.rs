use arc_swap::ArcSwap;
use axum::body::Bytes;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone, Debug)]
struct CachedPage {
    stored_at: Instant,
    body: Bytes,
}

type Snapshot = HashMap<u64, CachedPage>;

/// Rendered feed pages by page number, kept until their TTL runs out.
///
/// Readers load the current snapshot without locking. Writers swap in a new one.
#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    slot: ArcSwap<Snapshot>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: ArcSwap::from_pointee(Snapshot::new()),
        }
    }

    fn is_fresh(&self, page: &CachedPage, now: Instant) -> bool {
        now.duration_since(page.stored_at) < self.ttl
    }

    #[must_use]
    pub fn get(&self, number: u64) -> Option<Bytes> {
        let snapshot = self.slot.load();
        let page = snapshot.get(&number)?;

        if self.is_fresh(page, Instant::now()) {
            Some(page.body.clone())
        } else {
            debug!(number, "Cached page expired");
            None
        }
    }

    pub fn set(&self, number: u64, body: Bytes) {
        let now = Instant::now();
        let page = CachedPage {
            stored_at: now,
            body,
        };

        self.slot.rcu(|current| {
            let mut next: Snapshot = current
                .iter()
                .filter(|(_, cached)| self.is_fresh(cached, now))
                .map(|(number, cached)| (*number, cached.clone()))
                .collect();
            next.insert(number, page.clone());
            next
        });
    }

    pub fn clear(&self) {
        self.slot.store(Arc::default());
        debug!("Page cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::PageCache;
    use axum::body::Bytes;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.set(1, Bytes::from_static(b"first"));

        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(cache.get(1), Some(Bytes::from_static(b"first")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn pages_are_cached_independently() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.set(1, Bytes::from_static(b"page one"));
        tokio::time::advance(Duration::from_secs(15)).await;
        cache.set(2, Bytes::from_static(b"page two"));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some(Bytes::from_static(b"page two")));
    }

    #[tokio::test]
    async fn clear_evicts_everything() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.set(1, Bytes::from_static(b"page one"));
        cache.set(2, Bytes::from_static(b"page two"));

        cache.clear();

        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), None);
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_snapshots() {
        let cache = std::sync::Arc::new(PageCache::new(Duration::from_secs(20)));

        let writers: Vec<_> = (0..8_u64)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for round in 0..50 {
                        cache.set(i, Bytes::from(format!("{i}:{round}")));
                        if round % 10 == 0 {
                            cache.clear();
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        for i in 0..8_u64 {
            if let Some(body) = cache.get(i) {
                assert!(body.starts_with(format!("{i}:").as_bytes()));
            }
        }
    }
}
