//! Selection windows.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default window length in minutes.
pub const DEFAULT_WINDOW_MINUTES: i64 = 60;

/// Half-open time range `[start, end)` used to select photos for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SelectionWindow {
    /// Create a window from explicit bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `length` ending at `now`.
    pub fn trailing(now: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start: now - length,
            end: now,
        }
    }

    /// The default window: the 60 minutes preceding now.
    pub fn last_hour() -> Self {
        Self::trailing(Utc::now(), Duration::minutes(DEFAULT_WINDOW_MINUTES))
    }

    /// Whether `ts` falls inside the window (start inclusive, end exclusive).
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for SelectionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
