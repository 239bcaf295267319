//! Per-key serialization of in-flight submissions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use domain::IdempotencyKey;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks. Submissions under the same key run one at a time;
/// different keys never wait on each other.
///
/// Entries are held weakly and pruned once nobody holds or waits on them.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    locks: Mutex<HashMap<IdempotencyKey, Weak<AsyncMutex<()>>>>,
}

impl InFlight {
    /// Waits until no other submission holds `key`.
    pub(crate) async fn acquire(&self, key: &IdempotencyKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| lock.strong_count() > 0);
            match locks.get(key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(key.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of keys currently held or waited on.
    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn key(k: &str) -> IdempotencyKey {
        IdempotencyKey::new(k).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_waits() {
        let in_flight = Arc::new(InFlight::default());
        let first = in_flight.acquire(&key("k-1")).await;

        let waiter = {
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                let _guard = in_flight.acquire(&key("k-1")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let in_flight = InFlight::default();
        let _a = in_flight.acquire(&key("k-1")).await;
        let _b = in_flight.acquire(&key("k-2")).await;
        assert_eq!(in_flight.active(), 2);
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let in_flight = InFlight::default();
        drop(in_flight.acquire(&key("k-1")).await);
        assert_eq!(in_flight.active(), 0);

        let _guard = in_flight.acquire(&key("k-2")).await;
        assert_eq!(in_flight.locks.lock().unwrap().len(), 1);
    }
}
