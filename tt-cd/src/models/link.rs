//! Tracking link model and status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracking link lifecycle status
///
/// Transitions are monotone: `PENDING → VIEWED → COMPLETED`, with
/// `PENDING → COMPLETED` allowed when the view beacon never fired.
/// A link never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkStatus {
    /// Link issued, not yet opened
    Pending,
    /// Recipient opened the launch page
    Viewed,
    /// Recipient reported a completion (terminal)
    Completed,
}

impl LinkStatus {
    /// Stable string form stored in the tracking_links table
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Pending => "PENDING",
            LinkStatus::Viewed => "VIEWED",
            LinkStatus::Completed => "COMPLETED",
        }
    }

    /// Inverse of [`as_str`](Self::as_str)
    pub fn parse(s: &str) -> Option<LinkStatus> {
        match s {
            "PENDING" => Some(LinkStatus::Pending),
            "VIEWED" => Some(LinkStatus::Viewed),
            "COMPLETED" => Some(LinkStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issued launch link binding one recipient to one content item
///
/// Several links may coexist for the same (recipient, content) pair; each
/// has its own independent lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingLink {
    pub id: i64,

    pub recipient_id: i64,

    pub content_id: i64,

    /// Public high-entropy token carried in launch URLs (32 hex chars)
    pub unique_link_id: String,

    pub status: LinkStatus,

    /// Last reported completion score, 0-100 scale, caller-supplied and
    /// not independently validated
    pub score: Option<i64>,

    /// Interaction log as last reported by the tracking runtime
    pub interaction_data: serde_json::Value,

    pub created_at: DateTime<Utc>,

    /// Set once, on the first recorded view
    pub viewed_at: Option<DateTime<Utc>>,

    /// Refreshed on every recorded completion
    pub completed_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}
