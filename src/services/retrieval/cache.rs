//! Time-bounded retrieval result cache.
//!
//! Keys are exact `(query, top_k, knowledge_base_id)` triples; no query
//! normalisation happens. Expired entries are evicted when read.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::domain::models::SearchResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    top_k: usize,
    knowledge_base_id: Option<String>,
}

impl CacheKey {
    /// An empty knowledge base filter is the same as no filter.
    pub fn new(query: &str, top_k: usize, knowledge_base_id: Option<&str>) -> Self {
        Self {
            query: query.to_string(),
            top_k,
            knowledge_base_id: knowledge_base_id
                .filter(|kb| !kb.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<SearchResult>,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct RetrievalCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl RetrievalCache {
    /// A zero `ttl` disables the cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<SearchResult>> {
        if !self.is_enabled() {
            return None;
        }
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.results.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: CacheKey, results: Vec<SearchResult>) {
        if !self.is_enabled() {
            return;
        }
        let entry = CacheEntry {
            results,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn hit(id: &str) -> SearchResult {
        SearchResult {
            document_id: id.to_string(),
            knowledge_base_id: "1".to_string(),
            content: "text".to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = RetrievalCache::new(Duration::ZERO);
        let key = CacheKey::new("q", 5, None);
        cache.put(key.clone(), vec![hit("1")]);
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = RetrievalCache::new(Duration::from_secs(60));
        let key = CacheKey::new("q", 5, Some("3"));
        cache.put(key.clone(), vec![hit("1")]);
        assert_eq!(cache.get(&key).unwrap()[0].document_id, "1");
        assert!(cache.get(&CacheKey::new("q", 5, None)).is_none());
        assert!(cache.get(&CacheKey::new("q", 4, Some("3"))).is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = RetrievalCache::new(Duration::from_millis(10));
        let key = CacheKey::new("q", 5, None);
        cache.put(key.clone(), vec![hit("1")]);
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn prop_keys_distinguish_every_component(
            query in ".{0,16}",
            top_k in 1usize..50,
            kb in proptest::option::of("[0-9]{1,4}"),
        ) {
            let key = CacheKey::new(&query, top_k, kb.as_deref());
            prop_assert_eq!(&key, &CacheKey::new(&query, top_k, kb.as_deref()));
            prop_assert_ne!(&key, &CacheKey::new(&query, top_k + 1, kb.as_deref()));
            let other_query = format!("{query}|{top_k}");
            prop_assert_ne!(&key, &CacheKey::new(&other_query, top_k, kb.as_deref()));
            if kb.is_none() {
                prop_assert_eq!(&key, &CacheKey::new(&query, top_k, Some("")));
            }
        }
    }
}
