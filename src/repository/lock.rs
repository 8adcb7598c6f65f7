//! Per-resource write locks.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Serializes writers of the same resource; writers of distinct resources
/// never wait on each other.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for resource `id`. Hold `handle.lock()` while writing.
    pub fn get(&self, id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(id) {
            return Arc::clone(&lock);
        }
        Arc::clone(&self.locks.entry(id.to_string()).or_default())
    }

    /// Run `f` holding the lock of `id`. The handle is released afterwards
    /// unless another writer is waiting for it.
    pub fn with<T>(&self, id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.get(id);
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_same_id_shares_lock() {
        let locks = ResourceLocks::new();
        let a = locks.get("a");
        let b = locks.get("a");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &locks.get("b")));
    }

    #[test]
    fn test_with_releases_handle() {
        let locks = ResourceLocks::new();
        for n in 0..50 {
            assert_eq!(locks.with(&format!("page-{n}"), || n), n);
        }
        assert!(locks.is_empty());

        let held = locks.get("a");
        locks.with("a", || ());
        assert_eq!(locks.len(), 1);
        drop(held);
    }

    #[test]
    fn test_writers_of_one_resource_are_serialized() {
        let locks = Arc::new(ResourceLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..100 {
                        locks.with("page", || {
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
