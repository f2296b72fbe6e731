//! Per-host request spacing
//!
//! Consecutive requests to one retailer host are spaced by a minimum
//! interval plus random jitter. Requests to different hosts never wait on
//! each other.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spacing policy for outbound requests.
#[derive(Debug)]
pub struct HostThrottle {
    min_interval: Duration,
    jitter: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    pub fn new(min_interval: Duration, jitter: Duration) -> Self {
        Self {
            min_interval,
            jitter,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// No spacing at all.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn spacing(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.min_interval;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis());
        self.min_interval + Duration::from_millis(u64::try_from(extra).unwrap_or(u64::MAX))
    }

    /// Reserve the next slot for `host` and sleep until it arrives.
    ///
    /// The lock is held only while reserving, so waiting callers for the
    /// same host queue up in reservation order.
    pub async fn wait(&self, host: &str) {
        if self.min_interval.is_zero() && self.jitter.is_zero() {
            return;
        }

        let now = Instant::now();
        let ready_at = {
            let mut slots = self.next_slot.lock().await;
            let ready_at = slots.get(host).copied().filter(|t| *t > now).unwrap_or(now);
            slots.insert(host.to_string(), ready_at + self.spacing());
            ready_at
        };

        if ready_at > now {
            tracing::debug!(host, delay_ms = (ready_at - now).as_millis(), "Throttling request");
            tokio::time::sleep_until(ready_at).await;
        }
    }
}
