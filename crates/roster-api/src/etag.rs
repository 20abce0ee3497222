//! `ETag` encoding of version tokens.
//!
//! Tokens travel as weak entity tags holding the last-modification instant
//! in Unix microseconds: `W/"1767225600123456"`. The "never modified" token
//! is `W/"0"`. Parsing accepts strong and weak forms alike.

use roster_types::{VersionToken, VersionTokenError};

/// Why an inbound entity tag could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EtagError {
    /// The header was absent or empty.
    #[error("missing ETag")]
    Missing,

    /// The tag does not encode a version token.
    #[error("invalid ETag: {0}")]
    Invalid(#[from] VersionTokenError),
}

/// Encode `token` as a weak entity tag.
pub fn make_etag(token: VersionToken) -> String {
    format!("W/\"{}\"", token.as_micros())
}

/// Decode an entity tag produced by [`make_etag`], weak prefix optional.
///
/// # Errors
///
/// Returns [`EtagError::Missing`] for an empty header and
/// [`EtagError::Invalid`] if the value is not a quoted microsecond count.
pub fn parse_etag(header: &str) -> Result<VersionToken, EtagError> {
    let tag = header.trim();
    if tag.is_empty() {
        return Err(EtagError::Missing);
    }
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    let value = tag
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| VersionTokenError::Malformed(header.to_owned()))?;
    Ok(value.parse()?)
}

/// Whether an `If-None-Match` header matches the current tag (weak comparison).
pub fn none_match(header: &str, current: &str) -> bool {
    let opaque = |tag: &str| tag.trim().trim_start_matches("W/").to_owned();
    let current = opaque(current);
    header
        .split(',')
        .any(|candidate| candidate.trim() == "*" || opaque(candidate) == current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_modified_is_weak_zero() {
        assert_eq!(make_etag(VersionToken::NEVER_MODIFIED), "W/\"0\"");
        assert_eq!(parse_etag("W/\"0\""), Ok(VersionToken::NEVER_MODIFIED));
        assert_eq!(parse_etag("\"0\""), Ok(VersionToken::NEVER_MODIFIED));
    }

    #[test]
    fn tags_decode_back_to_their_token() {
        let token = VersionToken::from_micros(1_767_225_600_123_456).unwrap_or_default();
        let tag = make_etag(token);
        assert_eq!(tag, "W/\"1767225600123456\"");
        assert_eq!(parse_etag(&tag), Ok(token));
        assert_eq!(parse_etag("\"1767225600123456\""), Ok(token));
    }

    #[test]
    fn garbage_and_blank_headers_are_rejected() {
        assert_eq!(parse_etag("   "), Err(EtagError::Missing));
        assert!(matches!(parse_etag("W/\"abc\""), Err(EtagError::Invalid(_))));
    }

    #[test]
    fn tags_must_be_quoted() {
        for bad in ["0", "\"0", "0\"", "W/0", "W/\"", "\""] {
            assert!(
                matches!(parse_etag(bad), Err(EtagError::Invalid(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn if_none_match_uses_weak_comparison() {
        let current = "W/\"42\"";
        assert!(none_match("\"42\"", current));
        assert!(none_match("W/\"7\", W/\"42\"", current));
        assert!(none_match("*", current));
        assert!(!none_match("W/\"43\"", current));
    }
}
