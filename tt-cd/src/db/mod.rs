//! Database operations for tt-cd
//!
//! Thin query modules, one per aggregate. Multi-table writes (link
//! completion, ingestion persistence) run inside a transaction owned by the
//! calling service, so the write functions here take the transaction
//! explicitly.

pub mod content;
pub mod links;
pub mod recipients;
pub mod scores;
pub mod topics;

use chrono::{DateTime, Utc};
use tt_common::{Error, Result};

/// Parse an RFC3339 TEXT column value
pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Malformed timestamp '{}': {}", value, e)))
}

pub(crate) fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ts_accepts_rfc3339() {
        let ts = parse_ts("2026-01-15T12:00:00+00:00").unwrap();
        assert_eq!(ts.timestamp(), 1768478400);
        assert!(parse_ts("January 15th").is_err());
    }

    #[test]
    fn test_parse_opt_ts_passes_none_through() {
        assert_eq!(parse_opt_ts(None).unwrap(), None);
        assert!(parse_opt_ts(Some("bogus".to_string())).is_err());
    }
}
