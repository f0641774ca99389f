//! # Log Rate Limiting
//!
//! Background loops (switch samplers, radio interrupt servicing) can hit the
//! same failure on every iteration. [`LogThrottle`] caps how many of those
//! messages reach the logger per time window and counts the rest.
//!
//! ```rust
//! use rpi_components::util::logging::LogThrottle;
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("input read failed");
//! }
//! ```

use std::time::{Duration, Instant};

/// Fixed-window limiter for repeated log messages
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    cap: u32,
    count: u32,
    suppressed: u64,
    t0: Instant,
}

impl LogThrottle {
    /// Allow at most `cap` messages in every `window_ms` milliseconds
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Whether the next message may be logged
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0) > self.window {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        if self.count <= self.cap {
            true
        } else {
            self.suppressed += 1;
            false
        }
    }

    /// Messages dropped since creation
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Start a new window immediately
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Log a payload as hex at debug level, truncated to 64 bytes
pub fn log_payload_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    if data.len() > MAX_LOG_BYTES {
        log::debug!("{prefix}: {hex_str} ... ({} bytes total)", data.len());
    } else {
        log::debug!("{prefix}: {hex_str}");
    }
}
