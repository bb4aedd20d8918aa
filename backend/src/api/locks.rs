//! Per-artifact-key locking.
//!
//! Runs that share `(Comision, Actividad)` write the same two files. The
//! upload handler holds the key's lock for the whole run so both artifacts
//! on disk always come from the same upload.
//!
//! Entries live only while someone holds or waits for the key; the last
//! guard to drop removes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Debug, Clone, Default)]
pub struct ArtifactLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Exclusive hold on one artifact key.
#[derive(Debug)]
pub struct ArtifactGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    map: Arc<Mutex<LockMap>>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `key`; released when the guard drops.
    pub async fn acquire(&self, key: &str) -> ArtifactGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.to_string()).or_default().clone()
        };
        ArtifactGuard {
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
            map: Arc::clone(&self.inner),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters hold their own clone, so a count of one means only the map is left.
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        if map.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = ArtifactLocks::new();
        let guard = locks.acquire("A1_ALG1").await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.acquire("A1_ALG1")).await;
        assert!(waiting.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire("A1_ALG1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = ArtifactLocks::new();
        let _a = locks.acquire("A1_ALG1").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("A2_ALG1")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_finished_runs_leave_no_entries() {
        let locks = ArtifactLocks::new();
        for i in 0..1000 {
            let _guard = locks.acquire(&format!("C{}_ALG1", i)).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_awaited() {
        let locks = ArtifactLocks::new();
        let first = locks.acquire("A1_ALG1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire("A1_ALG1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
