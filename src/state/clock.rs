use std::sync::atomic::{AtomicI64, Ordering};

use time::{Duration, OffsetDateTime};
use tracing::debug;

/// Response header carrying the backend's wall clock in epoch milliseconds.
pub const SERVER_TIME_HEADER: &str = "x-server-time";
/// Largest drift accepted from the backend, in either direction.
pub const MAX_DEVIATION_MS: i64 = 24 * 60 * 60 * 1_000;

/// Tracks how far the local clock drifts from the Trackline backend.
#[derive(Debug, Default)]
pub struct ServerClock {
    deviation_ms: AtomicI64,
}

impl ServerClock {
    /// Create a clock assuming no deviation until the first response arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds to add to local time to obtain server time.
    pub fn deviation_ms(&self) -> i64 {
        self.deviation_ms.load(Ordering::Relaxed)
    }

    /// Record the value of an [`SERVER_TIME_HEADER`] header.
    ///
    /// Unparseable values and drifts beyond [`MAX_DEVIATION_MS`] are ignored.
    pub fn observe(&self, header: &str) {
        match deviation_from_header(header, OffsetDateTime::now_utc()) {
            Some(deviation) => self.deviation_ms.store(deviation, Ordering::Relaxed),
            None => debug!(value = header, "ignoring invalid server time header"),
        }
    }

    /// Current time as seen by the backend.
    pub fn server_now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        now.checked_add(Duration::milliseconds(self.deviation_ms()))
            .unwrap_or(now)
    }
}

fn deviation_from_header(header: &str, local: OffsetDateTime) -> Option<i64> {
    let server_ms = header.trim().parse::<i64>().ok()?;
    let local_ms = i64::try_from(local.unix_timestamp_nanos() / 1_000_000).ok()?;
    server_ms
        .checked_sub(local_ms)
        .filter(|deviation| (-MAX_DEVIATION_MS..=MAX_DEVIATION_MS).contains(deviation))
}
