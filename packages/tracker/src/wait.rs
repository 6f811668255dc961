use serde::Deserialize;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
/// Shortest sleep between polls; a zero interval is raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Bounds for a blocking wait-and-recheck loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "WaitConfig")]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_millis(timeout_ms: u64, interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    /// Check once, never sleep.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_INTERVAL)
    }
}

/// On-disk form used by workflow files.
#[derive(Debug, Clone, Copy, Deserialize)]
struct WaitConfig {
    timeout_ms: Option<u64>,
    interval_ms: Option<u64>,
}

impl From<WaitConfig> for WaitOptions {
    fn from(cfg: WaitConfig) -> Self {
        Self {
            timeout: cfg
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
            interval: cfg
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_INTERVAL),
        }
    }
}

/// Poll `condition` until it holds or `opts.timeout` elapses.
///
/// The condition is always evaluated at least once, and once more after the
/// deadline passes. Returns whether it ever held. Blocks the calling thread
/// between polls for at least [`MIN_INTERVAL`].
pub fn wait_until<F>(opts: WaitOptions, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= opts.timeout {
            return false;
        }
        let remaining = opts.timeout.saturating_sub(start.elapsed());
        std::thread::sleep(opts.interval.max(MIN_INTERVAL).min(remaining));
    }
}
