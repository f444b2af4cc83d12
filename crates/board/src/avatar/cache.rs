use indexmap::IndexMap;

pub const DEFAULT_AVATAR_CACHE_CAPACITY: usize = 100;

/// Bounded avatar cache keyed by the sender string.
///
/// Eviction is first-in first-out: reads do not refresh an entry's age.
/// The cache has a single owner and is mutated through `&mut self` only.
#[derive(Debug, Clone)]
pub struct AvatarCache<V> {
    entries: IndexMap<String, V>,
    capacity: usize,
}

impl<V> AvatarCache<V> {
    /// Creates a cache holding at most `capacity` avatars (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// Returns the cached avatar for `address`, generating it on a miss.
    ///
    /// Empty addresses have no avatar and are never cached.
    pub fn get_or_insert_with<F>(&mut self, address: &str, generate: F) -> Option<&V>
    where
        F: FnOnce(&str) -> V,
    {
        if address.is_empty() {
            return None;
        }

        if !self.entries.contains_key(address) {
            if self.entries.len() >= self.capacity
                && let Some((evicted, _)) = self.entries.shift_remove_index(0)
            {
                tracing::trace!(evicted = %evicted, capacity = self.capacity, "avatar evicted");
            }
            self.entries.insert(address.to_string(), generate(address));
        }

        self.entries.get(address)
    }
}

impl<V> Default for AvatarCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_AVATAR_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(index: usize) -> String {
        format!("0x{index:040x}")
    }

    #[test]
    fn inserting_past_capacity_evicts_only_the_oldest() {
        let mut cache = AvatarCache::default();
        for index in 0..100 {
            cache.get_or_insert_with(&address(index), |key| key.len());
        }
        assert_eq!(cache.len(), 100);

        cache.get_or_insert_with(&address(100), |key| key.len());
        assert_eq!(cache.len(), 100);
        assert!(!cache.contains(&address(0)));
        assert!((1..=100).all(|index| cache.contains(&address(index))));
    }

    #[test]
    fn hits_do_not_regenerate_or_refresh_age() {
        let mut cache = AvatarCache::new(2);
        let mut generated = 0;

        for key in ["0xaa", "0xbb", "0xaa"] {
            cache.get_or_insert_with(key, |_| {
                generated += 1;
                generated
            });
        }
        assert_eq!(generated, 2);

        cache.get_or_insert_with("0xcc", |_| 3);
        assert!(!cache.contains("0xaa"));
        assert!(cache.contains("0xbb"));
        assert_eq!(cache.get_or_insert_with("0xcc", |_| 99), Some(&3));
    }

    #[test]
    fn empty_address_has_no_avatar() {
        let mut cache = AvatarCache::<u8>::default();
        assert_eq!(cache.get_or_insert_with("", |_| 1), None);
        assert!(cache.is_empty());
    }
}
