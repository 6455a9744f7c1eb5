// Memoization cell with external invalidation
//
// De-duplicates request creation: a lookup recomputes only when the key is
// absent or the invalidation predicate reports the cached output stale. The
// predicate is consulted on every call, which is what keeps the cell in sync
// with externally-driven request removals.

use crate::error::JdiResult;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;

type KeyFn<I, K> = Box<dyn Fn(&I) -> K + Send + Sync>;
type ComputeFn<I, O> = Box<dyn Fn(&I) -> JdiResult<O> + Send + Sync>;
type InvalidFn<K> = Box<dyn Fn(&K) -> bool + Send + Sync>;

pub struct MemoCell<I, K, O> {
    storage: DashMap<K, O>,
    key_of: KeyFn<I, K>,
    compute: ComputeFn<I, O>,
    invalid: InvalidFn<K>,
}

impl<I, K, O> MemoCell<I, K, O>
where
    K: Eq + Hash + Clone,
    O: Clone,
{
    pub fn new(key_of: KeyFn<I, K>, compute: ComputeFn<I, O>, invalid: InvalidFn<K>) -> Self {
        Self {
            storage: DashMap::new(),
            key_of,
            compute,
            invalid,
        }
    }

    /// Return the cached output for `input`'s key, recomputing on a miss or
    /// when the invalidation predicate rejects the cached entry. Two
    /// simultaneous misses on the same key serialize on the entry guard.
    /// Failures are surfaced and never cached.
    pub fn lookup(&self, input: &I) -> JdiResult<O> {
        let key = (self.key_of)(input);
        match self.storage.entry(key) {
            Entry::Occupied(mut occupied) => {
                if (self.invalid)(occupied.key()) {
                    let output = (self.compute)(input)?;
                    occupied.insert(output.clone());
                    Ok(output)
                } else {
                    Ok(occupied.get().clone())
                }
            }
            Entry::Vacant(vacant) => {
                let output = (self.compute)(input)?;
                vacant.insert(output.clone());
                Ok(output)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JdiError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_cell(
        computes: Arc<AtomicUsize>,
        stale: Arc<AtomicBool>,
    ) -> MemoCell<String, String, usize> {
        MemoCell::new(
            Box::new(|input: &String| input.clone()),
            Box::new(move |_| Ok(computes.fetch_add(1, Ordering::SeqCst) + 1)),
            Box::new(move |_| stale.load(Ordering::SeqCst)),
        )
    }

    #[test]
    fn test_hit_returns_cached_output() {
        let computes = Arc::new(AtomicUsize::new(0));
        let cell = counting_cell(computes.clone(), Arc::new(AtomicBool::new(false)));

        assert_eq!(cell.lookup(&"a".to_string()).unwrap(), 1);
        assert_eq!(cell.lookup(&"a".to_string()).unwrap(), 1);
        assert_eq!(cell.lookup(&"b".to_string()).unwrap(), 2);
        assert_eq!(computes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidation_recomputes() {
        let computes = Arc::new(AtomicUsize::new(0));
        let stale = Arc::new(AtomicBool::new(false));
        let cell = counting_cell(computes, stale.clone());

        assert_eq!(cell.lookup(&"a".to_string()).unwrap(), 1);
        stale.store(true, Ordering::SeqCst);
        assert_eq!(cell.lookup(&"a".to_string()).unwrap(), 2);
        stale.store(false, Ordering::SeqCst);
        assert_eq!(cell.lookup(&"a".to_string()).unwrap(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let cell: MemoCell<String, String, usize> = MemoCell::new(
            Box::new(|input: &String| input.clone()),
            Box::new(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(JdiError::TerminalVm)
                } else {
                    Ok(99)
                }
            }),
            Box::new(|_| false),
        );

        assert!(cell.lookup(&"a".to_string()).is_err());
        assert!(cell.is_empty());
        assert_eq!(cell.lookup(&"a".to_string()).unwrap(), 99);
        assert_eq!(cell.len(), 1);
    }
}
