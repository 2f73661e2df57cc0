//! Recipient topic score upserts and reports

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tt_common::{time, Result};

use crate::models::TopicScore;

/// Record one completion attempt against a (recipient, topic) pair.
///
/// First occurrence inserts the row; subsequent calls increment. `passing`
/// decides whether `score` advances along with `attempts`. Runs inside the
/// completion transaction so the link update and every topic upsert land
/// together.
pub async fn record_topic_attempt(
    tx: &mut Transaction<'_, Sqlite>,
    recipient_id: i64,
    topic_name: &str,
    passing: bool,
) -> Result<()> {
    let score_delta: i64 = if passing { 1 } else { 0 };

    sqlx::query(
        r#"
        INSERT INTO recipient_topic_scores (recipient_id, topic_name, score, attempts, last_updated_at)
        VALUES (?, ?, ?, 1, ?)
        ON CONFLICT (recipient_id, topic_name) DO UPDATE SET
            score = score + excluded.score,
            attempts = attempts + 1,
            last_updated_at = excluded.last_updated_at
        "#,
    )
    .bind(recipient_id)
    .bind(topic_name)
    .bind(score_delta)
    .bind(time::to_storage(time::now()))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All aggregated topic scores for one recipient, most recent first
pub async fn scores_for_recipient(
    pool: &SqlitePool,
    recipient_id: i64,
) -> Result<Vec<TopicScore>> {
    let rows = sqlx::query(
        r#"
        SELECT recipient_id, topic_name, score, attempts, last_updated_at
        FROM recipient_topic_scores
        WHERE recipient_id = ?
        ORDER BY last_updated_at DESC, topic_name
        "#,
    )
    .bind(recipient_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let last_updated_at: String = row.get("last_updated_at");
            Ok(TopicScore {
                recipient_id: row.get("recipient_id"),
                topic_name: row.get("topic_name"),
                score: row.get("score"),
                attempts: row.get("attempts"),
                last_updated_at: super::parse_ts(&last_updated_at)?,
            })
        })
        .collect()
}

/// Fetch one (recipient, topic) row
pub async fn get_topic_score(
    pool: &SqlitePool,
    recipient_id: i64,
    topic_name: &str,
) -> Result<Option<TopicScore>> {
    let row = sqlx::query(
        r#"
        SELECT recipient_id, topic_name, score, attempts, last_updated_at
        FROM recipient_topic_scores
        WHERE recipient_id = ? AND topic_name = ?
        "#,
    )
    .bind(recipient_id)
    .bind(topic_name)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let last_updated_at: String = row.get("last_updated_at");
        Ok(TopicScore {
            recipient_id: row.get("recipient_id"),
            topic_name: row.get("topic_name"),
            score: row.get("score"),
            attempts: row.get("attempts"),
            last_updated_at: super::parse_ts(&last_updated_at)?,
        })
    })
    .transpose()
}
