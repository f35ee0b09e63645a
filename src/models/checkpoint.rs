use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use std::fmt;

pub const DEFAULT_WINDOW_IN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Origin {
    Stored,
    RunHistory,
    Default,
}

/// Boundary between entries that were already forwarded and new ones.
///
/// An entry is new only when its timestamp is strictly greater than `at`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Checkpoint {
    pub at: DateTime<Utc>,
    pub origin: Origin,
}

impl Checkpoint {
    pub fn new(at: DateTime<Utc>, origin: Origin) -> Self {
        Self { at, origin }
    }

    pub fn default_for(now: DateTime<Utc>) -> Self {
        Self {
            at: now - Duration::days(DEFAULT_WINDOW_IN_DAYS),
            origin: Origin::Default,
        }
    }

    pub fn is_delivered(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp <= self.at
    }

    /// Never moves the boundary backwards.
    pub fn advance(&self, candidate: DateTime<Utc>) -> Self {
        Self {
            at: self.at.max(candidate),
            origin: Origin::Stored,
        }
    }

    pub fn to_text(&self) -> String {
        self.at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Accepts RFC 3339, RFC 2822 and epoch milliseconds written by older runs.
    pub fn parse(text: &str, origin: Origin) -> Option<Self> {
        let text = text.trim();

        let at = match text.parse::<i64>() {
            Ok(millis) => Utc.timestamp_millis_opt(millis).single(),
            Err(_) => parse_timestamp(text),
        }?;

        Some(Self { at, origin })
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.to_text(), self.origin)
    }
}

pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.into());
    }

    match DateTime::parse_from_rfc2822(text) {
        Ok(date) => Some(date.into()),
        Err(_) => None,
    }
}
