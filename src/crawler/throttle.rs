//! Per-host request throttling
//!
//! Every worker of a run shares one `HostThrottle`, so the configured delay
//! holds per host even when several seeds are crawled at once.

use crate::state::DomainState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum delay between requests to the same host
pub struct HostThrottle {
    delay: Duration,
    domain_states: Mutex<HashMap<String, DomainState>>,
}

impl HostThrottle {
    /// Creates a throttle with the given per-host delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            domain_states: Mutex::new(HashMap::new()),
        }
    }

    /// The configured per-host delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until a request to `host` is allowed, then records it
    ///
    /// The slot is reserved before sleeping, so concurrent callers for the
    /// same host queue up one `delay` apart instead of all waking together.
    pub async fn wait_turn(&self, host: &str) {
        let wait = {
            let mut states = self.domain_states.lock().await;
            let state = states
                .entry(host.to_string())
                .or_insert_with(DomainState::new);

            let now = Instant::now();
            let wait = state
                .time_until_next_request(self.delay, now)
                .unwrap_or(Duration::ZERO);
            state.record_request(now + wait);
            wait
        };

        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} before next request to {}", wait, host);
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of requests recorded for a host
    pub async fn request_count(&self, host: &str) -> u32 {
        self.domain_states
            .lock()
            .await
            .get(host)
            .map_or(0, |state| state.request_count)
    }
}
