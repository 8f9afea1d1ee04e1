//! Distributed Lock
//!
//! The lock is the only ordering mechanism between concurrent `execute`
//! calls for the same transaction id. One instance is shared by every
//! transaction that must coordinate; keys provide the isolation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, error, warn};

use crate::config::LockConfig;

/// Keyed mutual-exclusion capability
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to acquire `key`. `Ok(false)` means another holder has it.
    async fn lock(&self, key: &str) -> anyhow::Result<bool>;

    /// Release `key`. Releasing a key that is not held is a no-op.
    async fn unlock(&self, key: &str);
}

/// Release obligation for an acquired key
///
/// `release` awaits `unlock` and disarms. A guard dropped while still armed
/// (the owning future was cancelled) hands `unlock` to the current tokio
/// runtime instead.
pub(crate) struct LockRelease {
    lock: Arc<dyn DistributedLock>,
    key: String,
    armed: bool,
}

impl LockRelease {
    pub(crate) fn new(lock: Arc<dyn DistributedLock>, key: impl Into<String>) -> Self {
        Self {
            lock,
            key: key.into(),
            armed: true,
        }
    }

    pub(crate) async fn release(mut self) {
        self.lock.unlock(&self.key).await;
        self.armed = false;
    }
}

impl Drop for LockRelease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(key = %key, "Lock holder cancelled, releasing in background");
                let lock = self.lock.clone();
                handle.spawn(async move {
                    lock.unlock(&key).await;
                });
            }
            Err(_) => {
                error!(key = %key, "Lock holder cancelled outside a runtime, lock left to expire");
            }
        }
    }
}

/// In-process lock backed by a lease table
///
/// A key is held until `unlock` or until its lease elapses, whichever comes
/// first. An elapsed lease is treated as abandoned by a crashed holder and
/// may be taken over. Leases carry no holder token, so a holder that
/// outlives its lease and then unlocks also releases the new holder.
pub struct InMemoryLock {
    leases: DashMap<String, Instant>,
    lease: Duration,
}

impl InMemoryLock {
    pub fn new(config: &LockConfig) -> Self {
        Self::with_lease(Duration::from_millis(config.lease_ms))
    }

    pub fn with_lease(lease: Duration) -> Self {
        Self {
            leases: DashMap::new(),
            lease,
        }
    }

    /// Whether `key` is currently held by an unexpired lease
    pub fn is_locked(&self, key: &str) -> bool {
        self.leases
            .get(key)
            .is_some_and(|deadline| *deadline > Instant::now())
    }
}

impl Default for InMemoryLock {
    fn default() -> Self {
        Self::new(&LockConfig::default())
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn lock(&self, key: &str) -> anyhow::Result<bool> {
        let now = Instant::now();
        match self.leases.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(now + self.lease);
                Ok(true)
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() > now {
                    debug!(key = key, "Lock held by another caller");
                    return Ok(false);
                }
                warn!(key = key, "Taking over expired lock lease");
                slot.insert(now + self.lease);
                Ok(true)
            }
        }
    }

    async fn unlock(&self, key: &str) {
        self.leases.remove(key);
    }
}


#[cfg(test)]
pub use mock::MockLock;
