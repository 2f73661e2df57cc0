//! Timestamp utilities
//!
//! All timestamps in TrainTrack are UTC. Three textual forms appear:
//! - RFC3339 for database columns
//! - whole-second `YYYY-MM-DDTHH:MM:SSZ` for event payloads
//! - ISO-basic `YYYYMMDDTHHMMSSZ` for request signing

use chrono::{DateTime, Timelike, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// RFC3339 form stored in database TEXT columns
pub fn to_storage(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Whole-second timestamp for event payloads.
///
/// Downstream consumers of the notification feed expect
/// `YYYY-MM-DDTHH:MM:SSZ`; a zero-nanosecond UTC timestamp serializes to
/// exactly that.
pub fn event_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// ISO-basic timestamp used in signed request headers and credential scopes
pub fn to_signing_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Date-only component of the credential scope
pub fn to_signing_datestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_storage_form_is_rfc3339() {
        let text = to_storage(fixed());
        assert!(text.starts_with("2026-01-15T12:00:00"));
        // RFC3339 keeps an explicit offset
        assert!(text.ends_with('Z') || text.contains('+'));
    }

    #[test]
    fn test_signing_forms_match_scope_layout() {
        assert_eq!(to_signing_timestamp(fixed()), "20260115T120000Z");
        assert_eq!(to_signing_datestamp(fixed()), "20260115");
    }

    #[test]
    fn test_event_timestamp_truncates_subsecond() {
        let ts = fixed() + chrono::Duration::milliseconds(987);
        let truncated = event_timestamp(ts);
        assert_eq!(truncated, fixed());
        // Whole-second UTC serializes without a fractional part
        assert_eq!(
            serde_json::to_value(truncated).unwrap(),
            "2026-01-15T12:00:00Z"
        );
    }
}
