use std::hash::{DefaultHasher, Hash, Hasher};

use crate::{Error, Result};

/// Open-addressing hash dictionary with quadratic probing.
///
/// Buckets are distinguished from live entries by a reserved `empty_key`
/// taken from the key space; removals additionally need a `tombstone_key`
/// so probe sequences stay valid across deletions. The table size is always
/// a power of two and occupation stays at or below 50%.
#[derive(Debug)]
pub struct Dictionary<K, V> {
    buckets: Vec<Bucket<K, V>>,
    /// Buckets holding a live value (not empty, not tombstone).
    n_items: usize,
    /// Buckets whose key is not the empty key (live + tombstones).
    n_busy: usize,
    empty_key: K,
    tombstone_key: Option<K>,
}

#[derive(Debug)]
struct Bucket<K, V> {
    key: K,
    value: Option<V>,
}

const INITIAL_SIZE: usize = 16;

/// Shrink when occupation falls below this share of the buckets. Never
/// shrinks below `INITIAL_SIZE`.
const SHRINK_FACTOR: f64 = 0.4;

fn hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Probe sequence: `(hash + i(i+1)/2) mod size`, size a power of two.
fn probe_index(hash: u64, i: u64, sizemask: usize) -> usize {
    (hash.wrapping_add(i * (i + 1) / 2) & sizemask as u64) as usize
}

/// Smallest power of two, at least `start_size`, keeping `n_items` under
/// 50% occupation.
fn minimum_size(start_size: usize, n_items: usize) -> usize {
    debug_assert!(start_size.is_power_of_two());
    let mut size = start_size;
    while size < 2 * n_items {
        size *= 2;
    }
    size
}

impl<K: Clone + Eq + Hash, V> Dictionary<K, V> {
    /// Creates an empty dictionary.
    ///
    /// `empty_key` marks unoccupied buckets and can never be inserted. For
    /// key types with a natural "null" value, that value is a good choice.
    #[must_use]
    pub fn new(empty_key: K) -> Self {
        let buckets = (0..INITIAL_SIZE)
            .map(|_| Bucket {
                key: empty_key.clone(),
                value: None,
            })
            .collect();
        Self {
            buckets,
            n_items: 0,
            n_busy: 0,
            empty_key,
            tombstone_key: None,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.n_items
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.n_items == 0
    }

    /// Number of buckets.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn is_sentinel(&self, key: &K) -> bool {
        *key == self.empty_key || self.tombstone_key.as_ref() == Some(key)
    }

    fn is_live(&self, bucket: &Bucket<K, V>) -> bool {
        !self.is_sentinel(&bucket.key)
    }

    /// Sets the key used to mark removed buckets, enabling [`remove()`].
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when equal to the empty key, and with
    /// `InvalidState` unless the table is completely empty (as right after
    /// creation): setting it later could alias keys already stored.
    ///
    /// [`remove()`]: Self::remove
    pub fn set_tombstone_key(&mut self, tombstone_key: K) -> Result<()> {
        if tombstone_key == self.empty_key {
            return Err(Error::InvalidParameters);
        }
        if self.n_busy != 0 {
            return Err(Error::InvalidState);
        }
        self.tombstone_key = Some(tombstone_key);
        Ok(())
    }

    fn insert_item(&mut self, hash: u64, key: K, value: V, overwrite: bool) -> bool {
        let sizemask = self.buckets.len() - 1;
        for i in 0..self.buckets.len() as u64 {
            let index = probe_index(hash, i, sizemask);
            let occupied = self.is_live(&self.buckets[index]);

            if !occupied {
                self.buckets[index] = Bucket {
                    key,
                    value: Some(value),
                };
                self.n_items += 1;
                self.n_busy += 1;
                return true;
            }

            if overwrite && self.buckets[index].key == key {
                self.buckets[index].value = Some(value);
                return true;
            }
        }
        // With occupation capped at 50% a free bucket always exists.
        unreachable!("no free bucket found");
    }

    fn resize(&mut self, size: usize) {
        debug_assert!(size.is_power_of_two());
        let old_buckets = std::mem::take(&mut self.buckets);
        self.buckets = (0..size)
            .map(|_| Bucket {
                key: self.empty_key.clone(),
                value: None,
            })
            .collect();
        self.n_items = 0;
        self.n_busy = 0;

        for bucket in old_buckets {
            if bucket.key == self.empty_key || self.tombstone_key.as_ref() == Some(&bucket.key) {
                continue;
            }
            let Some(value) = bucket.value else { continue };
            let hash = hash_key(&bucket.key);
            self.insert_item(hash, bucket.key, value, false);
        }
    }

    /// Grows or compacts as needed; `delta` is 1 when adding, 0 on removal.
    fn maybe_resize(&mut self, delta: usize) {
        let size = self.buckets.len();
        let shrink_limit = (SHRINK_FACTOR * size as f64) as usize;

        let needed = if delta > 0 && self.n_busy + delta > size / 2 {
            // Overpopulation when adding: rebuild without tombstones.
            minimum_size(INITIAL_SIZE, self.n_items + delta)
        } else if delta == 0 && self.n_items < shrink_limit {
            // Underpopulation while removing.
            minimum_size(INITIAL_SIZE, self.n_items)
        } else {
            size
        };

        if needed != size {
            self.resize(needed);
        }
    }

    /// Ensures capacity for `n_items` entries without growing later.
    pub fn reserve(&mut self, n_items: usize) {
        let size = minimum_size(self.buckets.len(), n_items);
        if size != self.buckets.len() {
            self.resize(size);
        }
    }

    /// Inserts or overwrites an entry.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when the key is the empty key or the
    /// tombstone key.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.is_sentinel(&key) {
            return Err(Error::InvalidParameters);
        }
        self.maybe_resize(1);
        let hash = hash_key(&key);
        self.insert_item(hash, key, value, true);
        Ok(())
    }

    fn bucket_index(&self, key: &K) -> Option<usize> {
        debug_assert!(!self.is_sentinel(key));
        let hash = hash_key(key);
        let sizemask = self.buckets.len() - 1;
        for i in 0..self.buckets.len() as u64 {
            let index = probe_index(hash, i, sizemask);
            let bucket_key = &self.buckets[index].key;

            if *bucket_key == self.empty_key {
                break;
            }
            // Without a tombstone key this arm can never match.
            if self.tombstone_key.as_ref() == Some(bucket_key) {
                continue;
            }
            if bucket_key == key {
                return Some(index);
            }
        }
        None
    }

    /// Looks up the value stored for a key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.bucket_index(key)?;
        self.buckets[index].value.as_ref()
    }

    #[must_use]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.bucket_index(key)?;
        self.buckets[index].value.as_mut()
    }

    /// Looks up the stored key and value. Useful when interning keys: the
    /// returned reference is the dictionary's own copy.
    #[must_use]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let index = self.bucket_index(key)?;
        let bucket = &self.buckets[index];
        Some((&bucket.key, bucket.value.as_ref()?))
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.bucket_index(key).is_some()
    }

    /// Removes an entry, returning its value. Removing an absent key is a
    /// no-op; removal is idempotent.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` when no tombstone key has been set.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        let Some(tombstone_key) = self.tombstone_key.clone() else {
            return Err(Error::InvalidState);
        };
        let Some(index) = self.bucket_index(key) else {
            return Ok(None);
        };
        let value = self.buckets[index].value.take();
        self.buckets[index].key = tombstone_key;
        self.n_items -= 1;
        self.maybe_resize(0);
        Ok(value)
    }

    /// Iterates live entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .filter(|bucket| self.is_live(bucket))
            .filter_map(|bucket| Some((&bucket.key, bucket.value.as_ref()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_dict() -> Dictionary<u32, u32> {
        // u32::MAX and u32::MAX - 1 are reserved as sentinels in these tests.
        let mut dict = Dictionary::new(u32::MAX);
        dict.set_tombstone_key(u32::MAX - 1).unwrap();
        dict
    }

    #[test]
    fn insert_get_round_trip() {
        let mut dict = new_dict();
        for key in 0..100_u32 {
            dict.insert(key, key * 2).unwrap();
        }
        for key in 0..100_u32 {
            assert_eq!(dict.get(&key), Some(&(key * 2)));
        }
        assert_eq!(dict.get(&100), None);
        assert_eq!(dict.len(), 100);
    }

    #[test]
    fn insert_overwrites() {
        let mut dict = new_dict();
        dict.insert(7, 1).unwrap();
        dict.insert(7, 2).unwrap();
        assert_eq!(dict.get(&7), Some(&2));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn occupation_stays_at_or_below_half() {
        let mut dict = new_dict();
        for key in 0..1024_u32 {
            dict.insert(key, key).unwrap();
            assert!(dict.len() * 2 <= dict.capacity());
        }
    }

    #[test]
    fn growth_and_shrink_cycle() {
        let mut dict = new_dict();
        assert_eq!(dict.capacity(), 16);
        for key in 1..=1024_u32 {
            dict.insert(key, key).unwrap();
        }
        assert_eq!(dict.len(), 1024);
        assert!(dict.capacity() > 16);

        for key in 1..=1024_u32 {
            dict.remove(&key).unwrap();
        }
        assert_eq!(dict.len(), 0);
        assert_eq!(dict.capacity(), 16);
    }

    #[test]
    fn remove_is_idempotent_and_absent_is_noop() {
        let mut dict = new_dict();
        dict.insert(1, 10).unwrap();
        assert_eq!(dict.remove(&1).unwrap(), Some(10));
        assert_eq!(dict.remove(&1).unwrap(), None);
        assert_eq!(dict.remove(&42).unwrap(), None);
        assert_eq!(dict.get(&1), None);
    }

    #[test]
    fn remove_requires_tombstone() {
        let mut dict: Dictionary<u32, u32> = Dictionary::new(u32::MAX);
        dict.insert(1, 10).unwrap();
        assert!(matches!(dict.remove(&1), Err(Error::InvalidState)));
        // Too late to set the tombstone now.
        assert!(matches!(
            dict.set_tombstone_key(u32::MAX - 1),
            Err(Error::InvalidState)
        ));
    }

    #[test]
    fn sentinel_keys_are_rejected() {
        let mut dict = new_dict();
        assert!(dict.insert(u32::MAX, 1).is_err());
        assert!(dict.insert(u32::MAX - 1, 1).is_err());
    }

    #[test]
    fn lookup_survives_tombstones_in_probe_path() {
        let mut dict = new_dict();
        for key in 0..12_u32 {
            dict.insert(key, key).unwrap();
        }
        for key in (0..12_u32).step_by(2) {
            dict.remove(&key).unwrap();
        }
        for key in (1..12_u32).step_by(2) {
            assert_eq!(dict.get(&key), Some(&key));
        }
    }

    #[test]
    fn get_key_value_returns_stored_key() {
        let mut dict: Dictionary<String, u32> = Dictionary::new(String::new());
        dict.insert("HasComponent".to_owned(), 47).unwrap();
        let (stored_key, value) = dict.get_key_value(&"HasComponent".to_owned()).unwrap();
        assert_eq!(stored_key, "HasComponent");
        assert_eq!(*value, 47);
    }
}
