//! Run-level mutual exclusion.
//!
//! A lock scope is a county name. Acquisition waits at most the given
//! timeout and then gives up; callers treat that as "another run is
//! active", never as an error.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Cross-run lock keyed by scope.
#[async_trait]
pub trait RunLock: Send + Sync {
    /// Tries to take `scope`, waiting at most `timeout`. Returns whether the
    /// lock is now held by the caller.
    async fn try_acquire(&self, scope: &str, timeout: Duration) -> bool;

    /// Releases `scope`. Releasing a scope that is not held is a no-op.
    async fn release(&self, scope: &str);
}

/// In-process [`RunLock`] that polls until the timeout elapses.
#[derive(Debug)]
pub struct LocalRunLock {
    held: Mutex<BTreeSet<String>>,
    poll_interval: Duration,
}

impl LocalRunLock {
    #[must_use]
    pub fn new() -> Self {
        Self::with_poll_interval(Duration::from_millis(250))
    }

    #[must_use]
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            held: Mutex::new(BTreeSet::new()),
            poll_interval,
        }
    }

    /// Whether `scope` is currently held.
    pub async fn is_held(&self, scope: &str) -> bool {
        self.held.lock().await.contains(scope)
    }
}

impl Default for LocalRunLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunLock for LocalRunLock {
    async fn try_acquire(&self, scope: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.held.lock().await.insert(scope.to_string()) {
                log::debug!("Acquired run lock '{scope}'");
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn release(&self, scope: &str) {
        if self.held.lock().await.remove(scope) {
            log::debug!("Released run lock '{scope}'");
        }
    }
}
