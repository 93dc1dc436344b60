use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

/// Bounded map with per-entry expiry. When full, expired entries are dropped
/// first, then the oldest insertion.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, (Instant, V)>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0 && !self.ttl.is_zero()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let (stored, value) = self.entries.get(key)?;
        if now.saturating_duration_since(*stored) < self.ttl {
            return Some(value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            let ttl = self.ttl;
            self.entries
                .retain(|_, (stored, _)| now.saturating_duration_since(*stored) < ttl);
            if self.entries.len() >= self.capacity {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, (stored, _))| *stored)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(key, (now, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let start = Instant::now();
        let mut cache = TtlCache::new(4, Duration::from_secs(300));
        cache.insert_at("q", 1, start);
        assert_eq!(cache.get_at(&"q", start + Duration::from_secs(299)), Some(1));
        assert_eq!(cache.get_at(&"q", start + Duration::from_secs(300)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_evicts_oldest() {
        let start = Instant::now();
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert_at("a", 1, start);
        cache.insert_at("b", 2, start + Duration::from_secs(1));
        cache.insert_at("c", 3, start + Duration::from_secs(2));
        let now = start + Duration::from_secs(3);
        assert_eq!(cache.get_at(&"a", now), None);
        assert_eq!(cache.get_at(&"b", now), Some(2));
        assert_eq!(cache.get_at(&"c", now), Some(3));
    }

    #[test]
    fn expired_entries_are_evicted_before_live_ones() {
        let start = Instant::now();
        let mut cache = TtlCache::new(2, Duration::from_secs(10));
        cache.insert_at("stale", 1, start);
        cache.insert_at("live", 2, start + Duration::from_secs(9));
        cache.insert_at("new", 3, start + Duration::from_secs(12));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(&"live", start + Duration::from_secs(12)), Some(2));
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let mut cache = TtlCache::new(0, Duration::from_secs(10));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
    }
}
