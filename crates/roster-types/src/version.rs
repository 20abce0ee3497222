//! Optimistic-concurrency version tokens.
//!
//! A [`VersionToken`] is the last-modification instant of an entity as seen
//! by a reader. Writers hand it back, and the store applies the write only
//! if the stored instant is still identical. `None` is the distinguished
//! "never modified" value; it matches only rows whose instant is still
//! `NULL`.
//!
//! The textual form is the instant in Unix microseconds, with `0` reserved
//! for "never modified". `PostgreSQL` stores `timestamptz` at microsecond
//! precision, so the textual form round-trips exactly.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};

/// Errors produced when decoding a version token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionTokenError {
    /// The token is not a decimal microsecond count.
    #[error("malformed version token: {0}")]
    Malformed(String),

    /// The microsecond count is outside the representable range.
    #[error("version token out of range: {0}")]
    OutOfRange(i64),
}

/// Opaque, totally-ordered encoding of an entity's last-modification instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionToken(Option<DateTime<Utc>>);

impl VersionToken {
    /// The token of an entity that has never been modified.
    pub const NEVER_MODIFIED: Self = Self(None);

    /// Build a token from a nullable last-modification column.
    pub const fn from_instant(instant: Option<DateTime<Utc>>) -> Self {
        Self(instant)
    }

    /// The instant this token stands for, `None` if never modified.
    pub const fn instant(self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Whether this is the "never modified" token.
    pub const fn is_never_modified(self) -> bool {
        self.0.is_none()
    }

    /// Microseconds since the Unix epoch, `0` for "never modified".
    pub fn as_micros(self) -> i64 {
        self.0.map_or(0, |t| t.timestamp_micros())
    }

    /// Decode a microsecond count, `0` meaning "never modified".
    ///
    /// # Errors
    ///
    /// Returns [`VersionTokenError::OutOfRange`] if chrono cannot represent
    /// the instant.
    pub fn from_micros(micros: i64) -> Result<Self, VersionTokenError> {
        if micros == 0 {
            return Ok(Self::NEVER_MODIFIED);
        }
        DateTime::from_timestamp_micros(micros)
            .map(|t| Self(Some(t)))
            .ok_or(VersionTokenError::OutOfRange(micros))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_micros())
    }
}

impl FromStr for VersionToken {
    type Err = VersionTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let micros: i64 = s
            .trim()
            .parse()
            .map_err(|_ignored: core::num::ParseIntError| VersionTokenError::Malformed(s.to_owned()))?;
        Self::from_micros(micros)
    }
}

impl From<Option<DateTime<Utc>>> for VersionToken {
    fn from(instant: Option<DateTime<Utc>>) -> Self {
        Self(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_modified_encodes_as_zero() {
        assert_eq!(VersionToken::NEVER_MODIFIED.to_string(), "0");
        assert_eq!("0".parse::<VersionToken>(), Ok(VersionToken::NEVER_MODIFIED));
    }

    #[test]
    fn microsecond_instants_survive_text_form() {
        let instant = DateTime::from_timestamp_micros(1_767_225_600_123_456);
        let token = VersionToken::from_instant(instant);
        let parsed: VersionToken = token.to_string().parse().unwrap_or_default();
        assert_eq!(parsed, token);
        assert!(!parsed.is_never_modified());
    }

    #[test]
    fn never_modified_orders_before_any_instant() {
        let later = VersionToken::from_instant(DateTime::from_timestamp_micros(1));
        assert!(VersionToken::NEVER_MODIFIED < later);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            "yesterday".parse::<VersionToken>(),
            Err(VersionTokenError::Malformed(_))
        ));
        assert!(matches!(
            VersionToken::from_micros(i64::MAX),
            Err(VersionTokenError::OutOfRange(_))
        ));
    }
}
