//! Timestamp normalization.
//!
//! Log dialects disagree on how they stamp lines: the MaaFramework main log
//! and loguru write `YYYY-MM-DD HH:MM:SS.fff`, while some agent services only
//! write the time of day. Both are folded into one canonical form,
//! `YYYY-MM-DD HH:MM:SS.mmm`, plus an epoch-millisecond value.
//!
//! Normalization never fails. Anything that cannot be read is passed through
//! verbatim with no epoch so a single bad stamp cannot abort a parse.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedTimestamp {
    pub canonical: String,
    pub epoch_ms: Option<i64>,
}

impl NormalizedTimestamp {
    fn passthrough(raw: &str) -> Self {
        Self {
            canonical: raw.to_string(),
            epoch_ms: None,
        }
    }
}

/// Normalize `raw`, completing time-only stamps with `base_date`.
///
/// Naive stamps are read as UTC so the epoch value does not depend on the
/// host timezone.
pub fn normalize(raw: &str, base_date: Option<&str>) -> NormalizedTimestamp {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedTimestamp::default();
    }

    if let Some((date, time)) = split_full(trimmed) {
        return compose(date, time).unwrap_or_else(|| NormalizedTimestamp::passthrough(raw));
    }

    if parse_time(trimmed).is_some() {
        return base_date
            .and_then(|date| compose(date, trimmed))
            .unwrap_or_else(|| NormalizedTimestamp::passthrough(raw));
    }

    NormalizedTimestamp::passthrough(raw)
}

/// `YYYY-MM-DD` prefix of a fully dated stamp.
pub fn date_of(raw: &str) -> Option<&str> {
    let (date, time) = split_full(raw.trim())?;
    parse_time(time)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(date)
}

/// True when `raw` is a full or time-only stamp this module understands.
pub fn looks_like_timestamp(raw: &str) -> bool {
    let trimmed = raw.trim();
    match split_full(trimmed) {
        Some((_, time)) => parse_time(time).is_some(),
        None => parse_time(trimmed).is_some(),
    }
}

/// Threads a base date through the lines of one file.
///
/// Starts from an optional fallback (typically the main log's date), then
/// adopts the date of the first fully dated line it sees and keeps it.
#[derive(Debug, Clone, Default)]
pub struct BaseDateTracker {
    inferred: Option<String>,
    fallback: Option<String>,
}

impl BaseDateTracker {
    pub fn new(fallback: Option<String>) -> Self {
        Self {
            inferred: None,
            fallback,
        }
    }

    pub fn observe(&mut self, raw: &str) {
        if self.inferred.is_none() {
            if let Some(date) = date_of(raw) {
                self.inferred = Some(date.to_string());
            }
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.inferred.as_deref().or(self.fallback.as_deref())
    }

    /// Date learned from the file itself, ignoring the fallback.
    pub fn inferred(&self) -> Option<&str> {
        self.inferred.as_deref()
    }

    pub fn normalize(&mut self, raw: &str) -> NormalizedTimestamp {
        self.observe(raw);
        normalize(raw, self.current())
    }
}

fn split_full(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() < 19 || !is_date_shape(&bytes[..10]) {
        return None;
    }
    if bytes[10] != b' ' && bytes[10] != b'T' {
        return None;
    }
    // bytes[..11] are ASCII, so both slices sit on char boundaries
    Some((&s[..10], &s[11..]))
}

fn is_date_shape(b: &[u8]) -> bool {
    b.len() == 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

/// `HH:MM:SS[.fraction]` → (hour, minute, second, millis)
fn parse_time(s: &str) -> Option<(u32, u32, u32, u32)> {
    let b = s.as_bytes();
    if b.len() < 8 || b[2] != b':' || b[5] != b':' {
        return None;
    }
    let digits = |r: &[u8]| -> Option<u32> {
        if r.iter().all(u8::is_ascii_digit) {
            Some(r.iter().fold(0, |acc, d| acc * 10 + u32::from(d - b'0')))
        } else {
            None
        }
    };
    let hour = digits(&b[0..2])?;
    let minute = digits(&b[3..5])?;
    let second = digits(&b[6..8])?;

    let millis = match &b[8..] {
        [] => 0,
        [sep, fraction @ ..] if (*sep == b'.' || *sep == b',') && !fraction.is_empty() => {
            if !fraction.iter().all(u8::is_ascii_digit) {
                return None;
            }
            // truncate or right-pad to exactly three digits
            fraction
                .iter()
                .chain(std::iter::repeat(&b'0'))
                .take(3)
                .fold(0, |acc, d| acc * 10 + u32::from(d - b'0'))
        }
        _ => return None,
    };

    Some((hour, minute, second, millis))
}

fn compose(date: &str, time: &str) -> Option<NormalizedTimestamp> {
    let (hour, minute, second, millis) = parse_time(time)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
    let datetime = NaiveDateTime::new(date, time);

    Some(NormalizedTimestamp {
        canonical: datetime.format(CANONICAL_FORMAT).to_string(),
        epoch_ms: Some(datetime.and_utc().timestamp_millis()),
    })
}
