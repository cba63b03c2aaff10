use anyhow::Result;
use arrow::record_batch::RecordBatch;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Single-slot memo for the running process. The slot is replaced whenever a
/// different key is computed; nothing else evicts it. Failed computations
/// are not stored.
pub struct SessionCache<K, V> {
    slot: Mutex<Option<(K, V)>>,
}

impl<K: PartialEq, V: Clone> SessionCache<K, V> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((k, v)) if k == key => Some(v.clone()),
            _ => None,
        }
    }

    /// Cached value for `key`, or the result of `compute` (stored on success).
    /// The lock is not held while computing.
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(hit) = self.get(&key) {
            debug!("session memo hit");
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn insert(&self, key: K, value: V) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((key, value));
    }
}

impl<K: PartialEq, V: Clone> Default for SessionCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a shared table: equal only to tokens of the very same
/// allocation. Holding the `Arc` keeps the address from being reused.
#[derive(Debug, Clone)]
pub struct TableToken(Arc<RecordBatch>);

impl TableToken {
    pub fn of(table: &Arc<RecordBatch>) -> Self {
        Self(Arc::clone(table))
    }
}

impl PartialEq for TableToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TableToken {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{batch, text};
    use anyhow::anyhow;
    use std::cell::Cell;

    #[test]
    fn computes_once_per_key() -> Result<()> {
        let cache: SessionCache<String, i32> = SessionCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };

        assert_eq!(cache.get_or_compute("a".into(), compute)?, 1);
        assert_eq!(cache.get_or_compute("a".into(), compute)?, 1);
        assert_eq!(calls.get(), 1);

        assert_eq!(cache.get_or_compute("b".into(), compute)?, 2);
        // "a" was replaced by "b"
        assert_eq!(cache.get(&"a".into()), None);
        assert_eq!(cache.get_or_compute("a".into(), compute)?, 3);
        Ok(())
    }

    #[test]
    fn errors_are_not_cached() -> Result<()> {
        let cache: SessionCache<u8, u8> = SessionCache::new();
        assert!(cache.get_or_compute(1, || Err(anyhow!("boom"))).is_err());
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get_or_compute(1, || Ok(7))?, 7);
        assert_eq!(cache.get_or_compute(1, || Err(anyhow!("not called")))?, 7);
        Ok(())
    }

    #[test]
    fn table_tokens_compare_by_identity() {
        let a = Arc::new(batch(vec![("x", text(&[Some("1")]))]));
        let same_content = Arc::new(batch(vec![("x", text(&[Some("1")]))]));
        assert_eq!(TableToken::of(&a), TableToken::of(&a.clone()));
        assert_ne!(TableToken::of(&a), TableToken::of(&same_content));
    }
}
