//! Content item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a content item arrived at the service
///
/// The upload kind decides the ingestion path: both zip kinds are extracted
/// and instrumented, raw markup is written out then instrumented, and video
/// is stored untouched and rendered inside the player page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// SCORM zip package
    Scorm,
    /// Plain zipped HTML bundle
    HtmlZip,
    /// Inline markup supplied in the upload request
    RawHtml,
    /// Video file, served as-is inside the player page
    Video,
}

impl UploadKind {
    /// Stable string form stored in the content table
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Scorm => "scorm",
            UploadKind::HtmlZip => "html_zip",
            UploadKind::RawHtml => "raw_html",
            UploadKind::Video => "video",
        }
    }

    /// Inverse of [`as_str`](Self::as_str)
    pub fn parse(s: &str) -> Option<UploadKind> {
        match s {
            "scorm" => Some(UploadKind::Scorm),
            "html_zip" => Some(UploadKind::HtmlZip),
            "raw_html" => Some(UploadKind::RawHtml),
            "video" => Some(UploadKind::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single uploaded training content item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,

    /// Owning account
    pub account_id: i64,

    pub title: String,

    pub description: String,

    /// Free-form category label, e.g. "training"
    pub content_type: String,

    pub upload_type: UploadKind,

    /// Path of the servable artifact relative to the content root.
    /// Holds the literal string "pending" until ingestion resolves it.
    pub content_identifier: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Whether ingestion has produced a servable artifact yet
    pub fn is_ingested(&self) -> bool {
        self.content_identifier != "pending"
    }
}
