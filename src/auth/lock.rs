//! Per-key async locks serializing writes to one (session, provider) token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::token::TokenKey;

/// Lock table keyed by [`TokenKey`]. Different keys never contend.
///
/// Entries exist only while someone holds or waits on them; the last
/// [`KeyGuard`] to drop removes its entry.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<TokenKey, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(self: &Arc<Self>, key: &TokenKey) -> KeyGuard {
        let slot = self.slot(key);
        let held = slot.lock_owned().await;
        KeyGuard {
            locks: Arc::clone(self),
            key: key.clone(),
            held: Some(held),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &TokenKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots();
        // Sweeps entries left behind by acquirers cancelled while waiting.
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        slots.entry(key.clone()).or_default().clone()
    }

    fn release(&self, key: &TokenKey) {
        let mut slots = self.slots();
        if slots
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(key);
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<TokenKey, Arc<AsyncMutex<()>>>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive access to one key; released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    locks: Arc<KeyLocks>,
    key: TokenKey,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Unlock before pruning so the entry's only remaining owner is the table.
        drop(self.held.take());
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_drop_removes_entry() {
        let locks = Arc::new(KeyLocks::new());
        let key = TokenKey::new("s1", "acme");
        let guard = locks.acquire(&key).await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn same_key_waits_for_holder() {
        let locks = Arc::new(KeyLocks::new());
        let key = TokenKey::new("s1", "acme");
        let first = locks.acquire(&key).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            tokio::spawn(async move {
                let _second = locks.acquire(&key).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = Arc::new(KeyLocks::new());
        let _a = locks.acquire(&TokenKey::new("s1", "acme")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(&TokenKey::new("s2", "acme")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_waiter_entry_is_swept() {
        let locks = Arc::new(KeyLocks::new());
        let key = TokenKey::new("s1", "acme");
        let held = locks.acquire(&key).await;
        let waited =
            tokio::time::timeout(Duration::from_millis(10), locks.acquire(&key)).await;
        assert!(waited.is_err());

        drop(held);
        assert!(locks.is_empty());
    }
}
