use std::time::{Duration, Instant};

/// Tracks per-host request timing during a crawl
///
/// The throttle keeps one of these per host so the configured delay is honored
/// between consecutive requests to the same site.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests made to this host since the process started
    pub request_count: u32,

    /// Timestamp of the last request to this host
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request was made to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    /// `last_request_time` may lie in the future when a slot was reserved ahead.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let ready_at = self.last_request_time? + delay;
        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }
}
