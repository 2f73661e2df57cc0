//! Tracking-link lifecycle
//!
//! One service owns a link from creation through first view to completion
//! with score aggregation. Status only ever moves forward
//! (PENDING -> VIEWED -> COMPLETED, with PENDING -> COMPLETED allowed for
//! content opened without the view beacon firing). Database writes land
//! first; events go out on the bus only after the write has committed, so
//! a subscriber can never observe an event for state that rolled back.

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info};
use tt_common::events::{DeliveryEvent, EventBus};
use tt_common::time;

use crate::config::{ReplayPolicy, ScoringPolicy};
use crate::db::{content, links, recipients, scores, topics};
use crate::error::ApiError;
use crate::models::TrackingLink;

/// What a completion call changed
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    /// Whether the score met the pass threshold
    pub passing: bool,
    /// Topic aggregates credited with this attempt
    pub topics_updated: usize,
}

/// Tracking-link lifecycle service
#[derive(Clone)]
pub struct LinkLifecycle {
    db: SqlitePool,
    event_bus: EventBus,
    scoring: ScoringPolicy,
}

impl LinkLifecycle {
    pub fn new(db: SqlitePool, event_bus: EventBus, scoring: ScoringPolicy) -> Self {
        Self {
            db,
            event_bus,
            scoring,
        }
    }

    /// Create a PENDING link for a recipient/content pair
    pub async fn create_link(
        &self,
        recipient_id: i64,
        content_id: i64,
    ) -> Result<TrackingLink, ApiError> {
        if recipients::get_recipient(&self.db, recipient_id)
            .await?
            .is_none()
        {
            return Err(ApiError::NotFound(format!(
                "recipient {} not found",
                recipient_id
            )));
        }
        if content::get_content(&self.db, content_id).await?.is_none() {
            return Err(ApiError::NotFound(format!(
                "content {} not found",
                content_id
            )));
        }

        let token = generate_link_token();
        links::insert_link(
            &self.db,
            &links::NewLink {
                recipient_id,
                content_id,
                unique_link_id: &token,
            },
        )
        .await?;

        let link = links::get_link_by_public_id(&self.db, &token)
            .await?
            .ok_or_else(|| ApiError::Internal("inserted link not readable".to_string()))?;

        info!(
            recipient_id,
            content_id,
            unique_link_id = %link.unique_link_id,
            "tracking link created"
        );
        Ok(link)
    }

    /// Record a view of the launch link.
    ///
    /// The status transition and `viewed_at` stamp happen at most once;
    /// the view event goes out on every call so downstream sees repeat
    /// opens. Returns whether this call was the first view.
    pub async fn record_view(&self, unique_link_id: &str) -> Result<bool, ApiError> {
        let link = self.require_link(unique_link_id).await?;

        let first_view = links::mark_viewed(&self.db, unique_link_id).await?;
        if first_view {
            debug!(unique_link_id, "first view recorded");
        }

        self.event_bus.emit_lossy(DeliveryEvent::ContentViewed {
            recipient_id: link.recipient_id,
            content_id: link.content_id,
            tracking_link_id: unique_link_id.to_string(),
            timestamp: time::event_timestamp(time::now()),
        });

        Ok(first_view)
    }

    /// Announce an in-content interaction.
    ///
    /// Interactions are transient: they feed the event stream but durable
    /// per-interaction state only arrives with the completion payload.
    pub async fn record_interaction(
        &self,
        unique_link_id: &str,
        topic: &str,
        success: bool,
    ) -> Result<(), ApiError> {
        let link = self.require_link(unique_link_id).await?;

        self.event_bus.emit_lossy(DeliveryEvent::Interaction {
            recipient_id: link.recipient_id,
            content_id: link.content_id,
            tracking_link_id: unique_link_id.to_string(),
            topic: topic.to_string(),
            success,
            timestamp: time::event_timestamp(time::now()),
        });

        Ok(())
    }

    /// Record a completion with its score and raw interaction log.
    ///
    /// The link update and all per-topic aggregate updates commit in one
    /// transaction. Scores are taken as reported; a repeat completion
    /// either overwrites or is rejected, per the configured replay policy.
    pub async fn record_completion(
        &self,
        unique_link_id: &str,
        score: i64,
        interactions: Value,
    ) -> Result<CompletionOutcome, ApiError> {
        let link = self.require_link(unique_link_id).await?;

        let interaction_text = serde_json::to_string(&interactions)
            .map_err(|e| ApiError::Internal(format!("interaction log: {}", e)))?;
        let reject_repeat = self.scoring.replay == ReplayPolicy::RejectResubmission;
        let passing = score >= self.scoring.pass_threshold;

        let mut tx = self.db.begin().await.map_err(tt_common::Error::from)?;

        let updated = links::mark_completed(
            &mut tx,
            unique_link_id,
            score,
            &interaction_text,
            reject_repeat,
        )
        .await?;
        if !updated {
            return Err(ApiError::Conflict(format!(
                "link {} already completed",
                unique_link_id
            )));
        }

        let mut topics_updated = 0;
        if passing || self.scoring.count_failed_attempts {
            let names = topics::topics_for_content(&mut *tx, link.content_id).await?;
            for name in &names {
                scores::record_topic_attempt(&mut tx, link.recipient_id, name, passing).await?;
            }
            topics_updated = names.len();
        }

        tx.commit().await.map_err(tt_common::Error::from)?;

        info!(
            unique_link_id,
            score, passing, topics_updated, "completion recorded"
        );

        self.event_bus.emit_lossy(DeliveryEvent::ContentCompleted {
            recipient_id: link.recipient_id,
            content_id: link.content_id,
            tracking_link_id: unique_link_id.to_string(),
            score,
            interactions,
            timestamp: time::event_timestamp(time::now()),
        });

        Ok(CompletionOutcome {
            passing,
            topics_updated,
        })
    }

    async fn require_link(&self, unique_link_id: &str) -> Result<TrackingLink, ApiError> {
        links::get_link_by_public_id(&self.db, unique_link_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("link {} not found", unique_link_id)))
    }
}

/// Public link token: 32 hex chars from 16 random bytes
pub fn generate_link_token() -> String {
    hex::encode(rand::thread_rng().gen::<[u8; 16]>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkStatus, UploadKind};
    use std::collections::HashSet;

    async fn seeded_db() -> (SqlitePool, i64, i64) {
        let pool = tt_common::db::init_memory_database().await.unwrap();

        sqlx::query("INSERT INTO accounts (name, created_at) VALUES ('acme', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        let recipient_id = sqlx::query(
            "INSERT INTO recipients (account_id, email, created_at) VALUES (1, 'pat@acme.test', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let content_id = content::insert_content(
            &pool,
            &content::NewContent {
                account_id: 1,
                title: "Security Basics",
                description: "",
                content_type: "training",
                upload_type: UploadKind::RawHtml,
                content_identifier: "content/1/launch.html",
            },
        )
        .await
        .unwrap();

        (pool, recipient_id, content_id)
    }

    async fn associate_topics(pool: &SqlitePool, content_id: i64, names: &[&str]) {
        let mut tx = pool.begin().await.unwrap();
        for name in names {
            let topic_id = topics::ensure_topic(&mut tx, name).await.unwrap();
            topics::associate_content_topic(&mut tx, content_id, topic_id)
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
    }

    fn lifecycle(pool: &SqlitePool, scoring: ScoringPolicy) -> (LinkLifecycle, EventBus) {
        let bus = EventBus::new(16);
        (
            LinkLifecycle::new(pool.clone(), bus.clone(), scoring),
            bus,
        )
    }

    #[test]
    fn test_token_shape() {
        let token = generate_link_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token, token.to_lowercase());
    }

    #[test]
    fn test_tokens_do_not_collide_across_many_draws() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_link_token()));
        }
    }

    #[tokio::test]
    async fn test_create_link_starts_pending() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        let (lifecycle, _bus) = lifecycle(&pool, ScoringPolicy::default());

        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();

        assert_eq!(link.status, LinkStatus::Pending);
        assert_eq!(link.unique_link_id.len(), 32);
        assert!(link.viewed_at.is_none());
        assert_eq!(link.interaction_data, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_create_link_rejects_unknown_recipient_and_content() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        let (lifecycle, _bus) = lifecycle(&pool, ScoringPolicy::default());

        let bad_recipient = lifecycle.create_link(recipient_id + 100, content_id).await;
        assert!(matches!(bad_recipient, Err(ApiError::NotFound(_))));

        let bad_content = lifecycle.create_link(recipient_id, content_id + 100).await;
        assert!(matches!(bad_content, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_view_transitions_once_but_always_announces() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        let (lifecycle, bus) = lifecycle(&pool, ScoringPolicy::default());
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();
        let mut rx = bus.subscribe();

        assert!(lifecycle.record_view(&link.unique_link_id).await.unwrap());
        assert!(!lifecycle.record_view(&link.unique_link_id).await.unwrap());

        let after = links::get_link_by_public_id(&pool, &link.unique_link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, LinkStatus::Viewed);
        assert!(after.viewed_at.is_some());

        // Both calls announced themselves
        for _ in 0..2 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type(), "content_viewed");
            assert_eq!(event.tracking_link_id(), link.unique_link_id);
        }
    }

    #[tokio::test]
    async fn test_view_of_unknown_link_is_not_found() {
        let (pool, _, _) = seeded_db().await;
        let (lifecycle, _bus) = lifecycle(&pool, ScoringPolicy::default());

        let result = lifecycle.record_view("feedfacefeedfacefeedfacefeedface").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_passing_completion_credits_every_associated_topic() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        associate_topics(&pool, content_id, &["phishing", "passwords"]).await;
        let (lifecycle, bus) = lifecycle(&pool, ScoringPolicy::default());
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();
        let mut rx = bus.subscribe();

        let outcome = lifecycle
            .record_completion(&link.unique_link_id, 70, serde_json::json!([{"q": 1}]))
            .await
            .unwrap();

        assert!(outcome.passing);
        assert_eq!(outcome.topics_updated, 2);

        let after = links::get_link_by_public_id(&pool, &link.unique_link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, LinkStatus::Completed);
        assert_eq!(after.score, Some(70));
        assert_eq!(after.interaction_data, serde_json::json!([{"q": 1}]));
        assert!(after.completed_at.is_some());

        for name in ["phishing", "passwords"] {
            let row = scores::get_topic_score(&pool, recipient_id, name)
                .await
                .unwrap()
                .unwrap();
            assert_eq!((row.score, row.attempts), (1, 1));
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "content_completed");
    }

    #[tokio::test]
    async fn test_repeat_passing_completion_accumulates_attempts() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        associate_topics(&pool, content_id, &["phishing"]).await;
        let (lifecycle, _bus) = lifecycle(&pool, ScoringPolicy::default());
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();

        lifecycle
            .record_completion(&link.unique_link_id, 80, serde_json::json!([]))
            .await
            .unwrap();
        lifecycle
            .record_completion(&link.unique_link_id, 95, serde_json::json!([]))
            .await
            .unwrap();

        let row = scores::get_topic_score(&pool, recipient_id, "phishing")
            .await
            .unwrap()
            .unwrap();
        assert_eq!((row.score, row.attempts), (2, 2));

        // Last write wins on the link itself
        let after = links::get_link_by_public_id(&pool, &link.unique_link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.score, Some(95));
    }

    #[tokio::test]
    async fn test_failing_completion_leaves_no_topic_rows_by_default() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        associate_topics(&pool, content_id, &["phishing"]).await;
        let (lifecycle, _bus) = lifecycle(&pool, ScoringPolicy::default());
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();

        let outcome = lifecycle
            .record_completion(&link.unique_link_id, 69, serde_json::json!([]))
            .await
            .unwrap();

        assert!(!outcome.passing);
        assert_eq!(outcome.topics_updated, 0);
        assert!(scores::get_topic_score(&pool, recipient_id, "phishing")
            .await
            .unwrap()
            .is_none());

        // The completion itself still lands
        let after = links::get_link_by_public_id(&pool, &link.unique_link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, LinkStatus::Completed);
        assert_eq!(after.score, Some(69));
    }

    #[tokio::test]
    async fn test_failed_attempts_counted_when_policy_enables_them() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        associate_topics(&pool, content_id, &["phishing"]).await;
        let scoring = ScoringPolicy {
            count_failed_attempts: true,
            ..ScoringPolicy::default()
        };
        let (lifecycle, _bus) = lifecycle(&pool, scoring);
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();

        lifecycle
            .record_completion(&link.unique_link_id, 40, serde_json::json!([]))
            .await
            .unwrap();

        let row = scores::get_topic_score(&pool, recipient_id, "phishing")
            .await
            .unwrap()
            .unwrap();
        assert_eq!((row.score, row.attempts), (0, 1));
        assert_eq!(row.success_rate(), Some(0.0));
    }

    #[tokio::test]
    async fn test_reject_policy_conflicts_on_resubmission() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        associate_topics(&pool, content_id, &["phishing"]).await;
        let scoring = ScoringPolicy {
            replay: ReplayPolicy::RejectResubmission,
            ..ScoringPolicy::default()
        };
        let (lifecycle, _bus) = lifecycle(&pool, scoring);
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();

        lifecycle
            .record_completion(&link.unique_link_id, 90, serde_json::json!([]))
            .await
            .unwrap();
        let second = lifecycle
            .record_completion(&link.unique_link_id, 10, serde_json::json!([]))
            .await;

        assert!(matches!(second, Err(ApiError::Conflict(_))));

        // Nothing from the rejected call stuck
        let after = links::get_link_by_public_id(&pool, &link.unique_link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.score, Some(90));
        let row = scores::get_topic_score(&pool, recipient_id, "phishing")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.attempts, 1);
    }

    #[tokio::test]
    async fn test_completion_straight_from_pending_is_allowed() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        let (lifecycle, _bus) = lifecycle(&pool, ScoringPolicy::default());
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();

        lifecycle
            .record_completion(&link.unique_link_id, 100, serde_json::json!([]))
            .await
            .unwrap();

        let after = links::get_link_by_public_id(&pool, &link.unique_link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, LinkStatus::Completed);
        assert!(after.viewed_at.is_none());
    }

    #[tokio::test]
    async fn test_interaction_announces_on_the_bus() {
        let (pool, recipient_id, content_id) = seeded_db().await;
        let (lifecycle, bus) = lifecycle(&pool, ScoringPolicy::default());
        let link = lifecycle.create_link(recipient_id, content_id).await.unwrap();
        let mut rx = bus.subscribe();

        lifecycle
            .record_interaction(&link.unique_link_id, "phishing", true)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        match event {
            DeliveryEvent::Interaction { topic, success, .. } => {
                assert_eq!(topic, "phishing");
                assert!(success);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
