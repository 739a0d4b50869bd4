//! Polling used by presence and visibility checks.
//!
//! Resolution itself never retries; callers that want to wait wrap a probe in
//! [`poll_until`], which re-runs it until it reports success or time runs out.

use std::time::{Duration, Instant};

use crate::result::PageResult;

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create wait options from raw milliseconds
    #[must_use]
    pub const fn new_with(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms,
        }
    }

    /// Set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Run `probe` until it returns `Ok(true)` or the timeout elapses.
///
/// The probe always runs at least once. Timing out yields `Ok(false)`; probe
/// errors are returned immediately.
pub fn poll_until<F>(options: &WaitOptions, mut probe: F) -> PageResult<bool>
where
    F: FnMut() -> PageResult<bool>,
{
    let start = Instant::now();
    loop {
        if probe()? {
            return Ok(true);
        }
        let elapsed = start.elapsed();
        if elapsed >= options.timeout() {
            return Ok(false);
        }
        std::thread::sleep(options.poll_interval().min(options.timeout() - elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverError;
    use crate::result::PageError;

    #[test]
    fn test_options_builder() {
        let options = WaitOptions::new()
            .with_timeout(Duration::from_millis(250))
            .with_poll_interval(5);
        assert_eq!(options.timeout_ms, 250);
        assert_eq!(options.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_probe_runs_once_with_zero_timeout() {
        let mut calls = 0;
        let options = WaitOptions::new().with_timeout(Duration::ZERO);
        let found = poll_until(&options, || {
            calls += 1;
            Ok(false)
        })
        .unwrap();
        assert!(!found);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_succeeds_on_later_attempt() {
        let mut calls = 0;
        let options = WaitOptions::new()
            .with_timeout(Duration::from_secs(2))
            .with_poll_interval(1);
        let found = poll_until(&options, || {
            calls += 1;
            Ok(calls == 3)
        })
        .unwrap();
        assert!(found);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_probe_error_stops_polling() {
        let options = WaitOptions::new().with_poll_interval(1);
        let err = poll_until(&options, || {
            Err(PageError::from(DriverError::Other("session closed".into())))
        })
        .unwrap_err();
        assert!(matches!(err, PageError::Driver(DriverError::Other(_))));
    }
}
