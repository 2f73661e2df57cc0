//! Service configuration
//!
//! Resolution order: TOML config file (located via `TRAINTRACK_CONFIG` or
//! the platform config directory), then environment overrides for
//! credentials, then built-in defaults. The resolved struct is passed to
//! each component's constructor; nothing reads configuration globals after
//! startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use tt_common::config::{locate_config_file, read_toml_config, resolve_root_folder};
use tt_common::Result;

/// Policy for a completion arriving on an already-completed link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Overwrite score, interactions, and completed_at on every call
    LastWriteWins,
    /// Reject the resubmission with a conflict error
    RejectResubmission,
}

/// Completion scoring policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Minimum score that counts as a pass
    pub pass_threshold: i64,

    /// Also record an attempt against associated topics when the score is
    /// below the threshold. Off by default: historically only passing
    /// completions were aggregated, which keeps stored success rates at
    /// 100% (see DESIGN.md).
    pub count_failed_attempts: bool,

    pub replay: ReplayPolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: 70,
            count_failed_attempts: false,
            replay: ReplayPolicy::LastWriteWins,
        }
    }
}

/// Annotation service client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// API key. Tagging degrades to pass-through when unset.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    /// Token budget for tagging responses
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 8192,
            timeout_secs: 60,
        }
    }
}

/// Event bus publisher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Destination topic ARN. Publishing is a logged no-op when unset.
    pub topic_arn: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            topic_arn: None,
            timeout_secs: 10,
        }
    }
}

/// On-disk TOML document. Everything is optional; defaults fill the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
struct TomlDocument {
    root_folder: Option<String>,
    bind_address: Option<String>,
    base_url: Option<String>,
    database_path: Option<String>,
    content_root: Option<String>,
    #[serde(default)]
    annotation: AnnotationConfig,
    #[serde(default)]
    event_bus: EventBusConfig,
    #[serde(default)]
    scoring: ScoringPolicy,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Socket address the HTTP server binds
    pub bind_address: String,

    /// External base URL used when constructing launch links
    pub base_url: String,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Directory holding extracted/instrumented content artifacts
    pub content_root: PathBuf,

    pub annotation: AnnotationConfig,

    pub event_bus: EventBusConfig,

    pub scoring: ScoringPolicy,
}

impl DeliveryConfig {
    /// Load configuration from the located TOML file plus environment
    /// overrides, falling back to defaults for anything unspecified.
    pub fn load() -> Result<Self> {
        let document = match locate_config_file() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                read_toml_config::<TomlDocument>(&path)?
            }
            None => {
                info!("No config file found, using defaults");
                TomlDocument::default()
            }
        };
        Ok(Self::from_document(document))
    }

    fn from_document(doc: TomlDocument) -> Self {
        let root = resolve_root_folder("TRAINTRACK_ROOT", doc.root_folder.as_deref());

        let mut annotation = doc.annotation;
        if let Ok(key) = std::env::var("TRAINTRACK_ANNOTATION_API_KEY") {
            if !key.trim().is_empty() {
                annotation.api_key = Some(key);
            }
        }

        let mut event_bus = doc.event_bus;
        if let Ok(key) = std::env::var("TRAINTRACK_AWS_ACCESS_KEY") {
            if !key.trim().is_empty() {
                event_bus.access_key = key;
            }
        }
        if let Ok(key) = std::env::var("TRAINTRACK_AWS_SECRET_KEY") {
            if !key.trim().is_empty() {
                event_bus.secret_key = key;
            }
        }
        if let Ok(arn) = std::env::var("TRAINTRACK_SNS_TOPIC_ARN") {
            if !arn.trim().is_empty() {
                event_bus.topic_arn = Some(arn);
            }
        }

        if annotation.api_key.is_none() {
            warn!("Annotation API key not configured - topic tagging will pass through");
        }
        if event_bus.topic_arn.is_none() {
            warn!("Event bus topic ARN not configured - events will not be published");
        }

        let bind_address = doc
            .bind_address
            .unwrap_or_else(|| "127.0.0.1:5876".to_string());
        let base_url = doc
            .base_url
            .unwrap_or_else(|| format!("http://{}", bind_address))
            .trim_end_matches('/')
            .to_string();

        Self {
            bind_address,
            base_url,
            database_path: doc
                .database_path
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join("traintrack.db")),
            content_root: doc
                .content_root
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join("content")),
            annotation,
            event_bus,
            scoring: doc.scoring,
        }
    }

    /// Launch URL for a public link token
    pub fn launch_url(&self, unique_link_id: &str) -> String {
        format!("{}/launch?id={}", self.base_url, unique_link_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_empty_document() {
        let config = DeliveryConfig::from_document(TomlDocument::default());
        assert_eq!(config.bind_address, "127.0.0.1:5876");
        assert_eq!(config.scoring.pass_threshold, 70);
        assert_eq!(config.scoring.replay, ReplayPolicy::LastWriteWins);
        assert!(config.annotation.api_key.is_none());
        assert!(config.database_path.ends_with("traintrack.db"));
        assert!(config.content_root.ends_with("content"));
    }

    #[test]
    fn test_document_overrides_defaults() {
        let doc: TomlDocument = toml::from_str(
            r#"
            bind_address = "0.0.0.0:8080"
            base_url = "https://training.example.com/"
            content_root = "/srv/tt/content"

            [scoring]
            pass_threshold = 80
            replay = "reject_resubmission"

            [annotation]
            api_key = "sk-test"
            max_tokens = 2048

            [event_bus]
            region = "eu-west-1"
            topic_arn = "arn:aws:sns:eu-west-1:123456789012:tt-events"
            "#,
        )
        .unwrap();
        let config = DeliveryConfig::from_document(doc);

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        // Trailing slash is stripped so launch URLs join cleanly
        assert_eq!(config.base_url, "https://training.example.com");
        assert_eq!(config.scoring.pass_threshold, 80);
        assert_eq!(config.scoring.replay, ReplayPolicy::RejectResubmission);
        assert_eq!(config.annotation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.annotation.max_tokens, 2048);
        assert_eq!(config.event_bus.region, "eu-west-1");
        assert_eq!(
            config.launch_url("00ff00ff00ff00ff00ff00ff00ff00ff"),
            "https://training.example.com/launch?id=00ff00ff00ff00ff00ff00ff00ff00ff"
        );
    }

    #[test]
    fn test_partial_scoring_section_keeps_other_defaults() {
        let doc: TomlDocument = toml::from_str(
            r#"
            [scoring]
            count_failed_attempts = true
            "#,
        )
        .unwrap();
        let config = DeliveryConfig::from_document(doc);
        assert!(config.scoring.count_failed_attempts);
        assert_eq!(config.scoring.pass_threshold, 70);
    }
}
