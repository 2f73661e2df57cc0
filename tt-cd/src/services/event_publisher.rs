//! Event publishing to the AWS SNS notification topic
//!
//! Delivery milestones fan out on the in-process event bus; this module
//! signs and posts them to the configured SNS topic so downstream systems
//! (reporting, reminder scheduling) hear about them. Publishing is
//! best-effort: a failed publish is logged and never propagates to the
//! request that produced the event.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use tt_common::events::{DeliveryEvent, EventBus};

use crate::config::EventBusConfig;
use crate::services::sigv4::{self, Credentials};

const SNS_API_VERSION: &str = "2010-03-31";

/// Signed SNS `Publish` client
pub struct SnsPublisher {
    http_client: reqwest::Client,
    config: EventBusConfig,
}

impl SnsPublisher {
    pub fn new(config: EventBusConfig) -> tt_common::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| tt_common::Error::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Publish one event. Returns whether the topic accepted it.
    pub async fn publish(&self, event: &DeliveryEvent) -> bool {
        let Some(topic_arn) = self.config.topic_arn.as_deref() else {
            debug!(
                event_type = event.event_type(),
                "publish skipped, no topic ARN configured"
            );
            return false;
        };

        let message = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "event serialization failed");
                return false;
            }
        };

        let host = format!("sns.{}.amazonaws.com", self.config.region);
        let body = publish_form_body(
            topic_arn,
            &message,
            event.subject(),
            &message_attributes(event),
        );

        // The form body is the signed payload; the query string stays empty.
        let headers = vec![
            (
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("host".to_string(), host.clone()),
        ];
        let signed = sigv4::sign_request(
            &Credentials {
                access_key: &self.config.access_key,
                secret_key: &self.config.secret_key,
            },
            &self.config.region,
            "sns",
            "POST",
            "/",
            "",
            &headers,
            &body,
            Utc::now(),
        );

        let response = self
            .http_client
            .post(format!("https://{}/", host))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Authorization", signed.authorization)
            .header("X-Amz-Date", signed.amz_date)
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                debug!(event_type = event.event_type(), "event published");
                true
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %text, "event publish rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "event publish failed");
                false
            }
        }
    }
}

/// Forward every bus event to the notification topic.
///
/// Spawned once at startup; runs until the event bus closes. A lagged
/// receiver drops the missed events and keeps going.
pub async fn run_publisher_bridge(bus: &EventBus, publisher: SnsPublisher) {
    let mut receiver = bus.subscribe();
    debug!("event publisher bridge started");

    loop {
        match receiver.recv().await {
            Ok(event) => {
                publisher.publish(&event).await;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event publisher lagged, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    debug!("event publisher bridge stopped");
}

/// Message attributes for one event: always the event type, plus the topic
/// for interactions and the score for completions.
fn message_attributes(event: &DeliveryEvent) -> Vec<(&'static str, String)> {
    let mut attributes = vec![("event_type", event.event_type().to_string())];
    match event {
        DeliveryEvent::Interaction { topic, .. } => {
            attributes.push(("topic", topic.clone()));
        }
        DeliveryEvent::ContentCompleted { score, .. } => {
            attributes.push(("score", score.to_string()));
        }
        DeliveryEvent::ContentViewed { .. } => {}
    }
    attributes
}

/// Form-encoded `Publish` call body, attribute entries numbered from 1
fn publish_form_body(
    topic_arn: &str,
    message: &str,
    subject: &str,
    attributes: &[(&'static str, String)],
) -> String {
    let mut pairs = vec![
        ("Action".to_string(), "Publish".to_string()),
        ("TopicArn".to_string(), topic_arn.to_string()),
        ("Message".to_string(), message.to_string()),
        ("Version".to_string(), SNS_API_VERSION.to_string()),
        ("Subject".to_string(), subject.to_string()),
    ];
    for (i, (name, value)) in attributes.iter().enumerate() {
        let entry = i + 1;
        pairs.push((
            format!("MessageAttributes.entry.{}.Name", entry),
            name.to_string(),
        ));
        pairs.push((
            format!("MessageAttributes.entry.{}.Value.DataType", entry),
            "String".to_string(),
        ));
        pairs.push((
            format!("MessageAttributes.entry.{}.Value.StringValue", entry),
            value.clone(),
        ));
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
