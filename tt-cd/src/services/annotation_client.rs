//! HTML topic annotation via the Claude Messages API
//!
//! Uploaded training markup is sent out once, at ingestion time, to have
//! `data-tag` attributes added to its interactive elements and to name the
//! topics it covers. Annotation is strictly best-effort: any failure
//! degrades to the original markup with an empty topic list, and ingestion
//! carries on.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::AnnotationConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Topic-only responses fit in one short line
const TOPIC_MAX_TOKENS: u32 = 256;

const TAG_PROMPT: &str = "You will receive an HTML training document. Add a data-tag \
attribute to every interactive element (links, buttons, and form controls) naming the \
training topic that element exercises, as a short lowercase identifier. Leave all other \
markup exactly as it is. After the document, add one line of the form:\n\
TAGS: first topic, second topic\n\
listing every topic the document covers. Return only the HTML and the TAGS line.";

const TOPIC_PROMPT: &str = "List the training topics covered by the following content \
as a single comma-separated line, with no other text.";

/// Result of one annotation pass over an HTML document
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedContent {
    pub html: String,
    pub topics: Vec<String>,
}

/// Annotation seam (allows a passthrough in tests and keyless deployments)
#[async_trait]
pub trait TopicTagger: Send + Sync {
    /// Annotate interactive elements and name the topics the document covers.
    ///
    /// Never fails the caller: implementations degrade to the input markup
    /// with no topics when annotation is unavailable.
    async fn tag(&self, html: &str) -> TaggedContent;

    /// Name the topics covered by a fragment of text
    async fn extract_topics(&self, text: &str) -> Vec<String>;
}

/// Annotation API errors. Callers of [`TopicTagger`] only ever see the
/// degraded result; these exist for logging.
#[derive(Debug, Error)]
enum AnnotationError {
    #[error("no API key configured")]
    MissingKey,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Claude Messages API client
pub struct AnnotationClient {
    http_client: reqwest::Client,
    config: AnnotationConfig,
}

impl AnnotationClient {
    pub fn new(config: AnnotationConfig) -> tt_common::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| tt_common::Error::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// One message round trip, returning the first text block of the reply
    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String, AnnotationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AnnotationError::MissingKey)?;

        let body = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        tracing::debug!(model = %self.config.model, max_tokens, "querying annotation API");

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnnotationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnnotationError::Api(status.as_u16(), error_text));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnnotationError::Malformed(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AnnotationError::Malformed("reply carried no text block".to_string()))
    }
}

#[async_trait]
impl TopicTagger for AnnotationClient {
    async fn tag(&self, html: &str) -> TaggedContent {
        let prompt = format!("{}\n\n{}", TAG_PROMPT, html);

        match self.complete(prompt, self.config.max_tokens).await {
            Ok(reply) => {
                let (tagged, topics) = parse_tagged_response(&reply);
                if tagged.is_empty() {
                    // Model returned a topic list but no markup; keep the
                    // original document rather than publishing nothing.
                    tracing::warn!("annotation reply carried no markup, keeping original");
                    return TaggedContent {
                        html: html.to_string(),
                        topics,
                    };
                }
                tracing::info!(topics = topics.len(), "content annotated");
                TaggedContent {
                    html: tagged,
                    topics,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "annotation unavailable, serving content untagged");
                TaggedContent {
                    html: html.to_string(),
                    topics: Vec::new(),
                }
            }
        }
    }

    async fn extract_topics(&self, text: &str) -> Vec<String> {
        let prompt = format!("{}\n\n{}", TOPIC_PROMPT, text);

        match self.complete(prompt, TOPIC_MAX_TOKENS).await {
            Ok(reply) => parse_topic_list(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "topic extraction unavailable");
                Vec::new()
            }
        }
    }
}

/// Tagger for deployments without an API key; content flows through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTagger;

#[async_trait]
impl TopicTagger for PassthroughTagger {
    async fn tag(&self, html: &str) -> TaggedContent {
        TaggedContent {
            html: html.to_string(),
            topics: Vec::new(),
        }
    }

    async fn extract_topics(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Split an annotation reply into the tagged markup and its topic list.
///
/// The list rides on the first line starting with `TAGS:`; every such line
/// is stripped from the returned markup.
pub fn parse_tagged_response(reply: &str) -> (String, Vec<String>) {
    let mut topics = Vec::new();
    let mut kept = Vec::new();

    for line in reply.lines() {
        if let Some(rest) = line.strip_prefix("TAGS:") {
            if topics.is_empty() {
                topics = parse_topic_list(rest);
            }
        } else {
            kept.push(line);
        }
    }

    (kept.join("\n").trim().to_string(), topics)
}

/// Parse a comma-separated topic line into normalized, deduplicated names
pub fn parse_topic_list(raw: &str) -> Vec<String> {
    let mut topics = Vec::new();
    for part in raw.split(',') {
        let topic = normalize_topic(part);
        if !topic.is_empty() && !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    topics
}

/// Normalize one topic name: trimmed, lowercased, spaces collapsed to `_`
pub fn normalize_topic(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
