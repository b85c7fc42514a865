use std::hash::Hash;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::Result;
use crate::collections::Dictionary;

/// Thread-safe wrapper around [`Dictionary`].
///
/// Two read shapes are offered: [`get_and_lock()`] hands out a guard that
/// keeps the lock held for as long as the reference lives, and
/// [`get_copy_with()`] takes a snapshot under the lock and releases it
/// before returning. All other operations lock, act, and unlock atomically.
///
/// [`get_and_lock()`]: Self::get_and_lock
/// [`get_copy_with()`]: Self::get_copy_with
#[derive(Debug)]
pub struct TSafeDictionary<K, V> {
    inner: Mutex<Dictionary<K, V>>,
}

/// Locked reference into a [`TSafeDictionary`]; the lock is released when
/// the guard is dropped.
pub type LockedValue<'a, V> = MappedMutexGuard<'a, V>;

impl<K: Clone + Eq + Hash, V> TSafeDictionary<K, V> {
    #[must_use]
    pub fn new(empty_key: K) -> Self {
        Self {
            inner: Mutex::new(Dictionary::new(empty_key)),
        }
    }

    /// See [`Dictionary::set_tombstone_key()`].
    ///
    /// # Errors
    ///
    /// Fails as the unwrapped operation does.
    pub fn set_tombstone_key(&self, tombstone_key: K) -> Result<()> {
        self.inner.lock().set_tombstone_key(tombstone_key)
    }

    /// See [`Dictionary::insert()`].
    ///
    /// # Errors
    ///
    /// Fails as the unwrapped operation does.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.inner.lock().insert(key, value)
    }

    /// See [`Dictionary::remove()`].
    ///
    /// # Errors
    ///
    /// Fails as the unwrapped operation does.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        self.inner.lock().remove(key)
    }

    /// Looks up a value and returns a reference that keeps the dictionary
    /// locked. Other threads block until the returned guard is dropped.
    #[must_use]
    pub fn get_and_lock(&self, key: &K) -> Option<LockedValue<'_, V>> {
        let guard = self.inner.lock();
        MutexGuard::try_map(guard, |dict| dict.get_mut(key)).ok()
    }

    /// Looks up a value and returns an owned snapshot produced by `copy`
    /// while holding the lock. The lock is released before returning.
    #[must_use]
    pub fn get_copy_with<R>(&self, key: &K, copy: impl FnOnce(&V) -> R) -> Option<R> {
        let guard = self.inner.lock();
        guard.get(key).map(copy)
    }

    /// Snapshot read for cloneable values.
    #[must_use]
    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get_copy_with(key, V::clone)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs a closure over the locked dictionary. Escape hatch for compound
    /// updates that must be atomic.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut Dictionary<K, V>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn locked_read_blocks_writer() {
        let dict = Arc::new(TSafeDictionary::new(u32::MAX));
        dict.insert(1_u32, 10_u32).unwrap();

        let locked = dict.get_and_lock(&1).unwrap();
        assert_eq!(*locked, 10);

        let writer = {
            let dict = Arc::clone(&dict);
            thread::spawn(move || dict.insert(2, 20).unwrap())
        };
        // The writer can only proceed once the guard is gone.
        drop(locked);
        writer.join().unwrap();
        assert_eq!(dict.get_cloned(&2), Some(20));
    }

    #[test]
    fn copy_read_releases_lock() {
        let dict = TSafeDictionary::new(u32::MAX);
        dict.insert(1_u32, String::from("value")).unwrap();
        let snapshot = dict.get_copy_with(&1, String::clone).unwrap();
        // Lock is free again.
        dict.insert(2, String::from("other")).unwrap();
        assert_eq!(snapshot, "value");
    }

    #[test]
    fn concurrent_inserts() {
        let dict = Arc::new(TSafeDictionary::new(u64::MAX));
        let threads: Vec<_> = (0..4_u64)
            .map(|t| {
                let dict = Arc::clone(&dict);
                thread::spawn(move || {
                    for i in 0..100_u64 {
                        dict.insert(t * 1000 + i, i).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(dict.len(), 400);
    }
}
