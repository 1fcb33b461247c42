//! A fixed-window request limiter for the accrual service's reward query endpoint.
use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use log::*;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    /// Zero disables the limiter.
    max_requests: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window, state: Mutex::new(Window { started: Instant::now(), count: 0 }) }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }

    /// Counts a request against the current window. If the window is full, returns how long the caller should wait,
    /// rounded up to whole seconds.
    pub fn check(&self) -> Result<(), Duration> {
        self.check_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }
        let mut window = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }
        if window.count < self.max_requests {
            window.count += 1;
            return Ok(());
        }
        let remaining = self.window.saturating_sub(now.saturating_duration_since(window.started));
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        trace!("💻️ Request limit of {} reached. {secs}s left in the window", self.max_requests);
        Err(Duration::from_secs(secs.max(1)))
    }
}
