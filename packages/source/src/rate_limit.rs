//! Per-host minimum inter-request delay.
//!
//! Callers reserve the next free slot for a host under a short lock and then
//! sleep outside it, so concurrent detail fetches against the same host are
//! spaced out while different hosts never wait on each other.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared slot book keyed by host name.
#[derive(Debug, Default)]
pub struct HostRateLimiter {
    next_slot: Mutex<BTreeMap<String, Instant>>,
}

impl HostRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until a request to `url`'s host may be sent, then books the
    /// following slot `min_interval` later.
    pub async fn wait(&self, url: &str, min_interval: Duration) {
        let slot = self.reserve(&host_of(url), min_interval).await;
        tokio::time::sleep_until(slot).await;
    }

    async fn reserve(&self, host: &str, min_interval: Duration) -> Instant {
        let now = Instant::now();
        let mut slots = self.next_slot.lock().await;
        let slot = slots
            .get(host)
            .copied()
            .filter(|next| *next > now)
            .unwrap_or(now);
        slots.insert(host.to_string(), slot + min_interval);
        drop(slots);
        slot
    }
}

/// Host component of `url`, or the whole string when it does not parse.
#[must_use]
pub fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| url.to_string())
}
