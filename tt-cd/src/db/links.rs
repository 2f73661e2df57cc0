//! Tracking link queries
//!
//! Status handling enforces the monotone state machine at the SQL level:
//! the view update only fires while `viewed_at` is unset and never moves a
//! link backward from COMPLETED.

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tt_common::{time, Error, Result};

use crate::models::{LinkStatus, TrackingLink, UploadKind};

/// Fields for a new PENDING link
#[derive(Debug)]
pub struct NewLink<'a> {
    pub recipient_id: i64,
    pub content_id: i64,
    pub unique_link_id: &'a str,
}

/// Everything the launch page needs, resolved in one lookup
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub link: TrackingLink,
    pub content_title: String,
    pub upload_type: UploadKind,
    pub content_identifier: String,
}

/// Insert a PENDING link, returning its row id
pub async fn insert_link(pool: &SqlitePool, new: &NewLink<'_>) -> Result<i64> {
    let now = time::to_storage(time::now());

    let result = sqlx::query(
        r#"
        INSERT INTO tracking_links
            (recipient_id, content_id, unique_link_id, status, interaction_data, created_at, updated_at)
        VALUES (?, ?, ?, 'PENDING', '{}', ?, ?)
        "#,
    )
    .bind(new.recipient_id)
    .bind(new.content_id)
    .bind(new.unique_link_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a link by its public token
pub async fn get_link_by_public_id(
    pool: &SqlitePool,
    unique_link_id: &str,
) -> Result<Option<TrackingLink>> {
    let row = sqlx::query(
        r#"
        SELECT id, recipient_id, content_id, unique_link_id, status, score,
               interaction_data, created_at, viewed_at, completed_at, updated_at
        FROM tracking_links
        WHERE unique_link_id = ?
        "#,
    )
    .bind(unique_link_id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_link).transpose()
}

/// First-view update: stamps `viewed_at` and advances PENDING to VIEWED.
///
/// Conditional on `viewed_at IS NULL`, so repeat calls (including
/// concurrent duplicates) change nothing. A link already COMPLETED keeps
/// its status; only the view timestamp is recorded. Returns whether this
/// call performed the stamp.
pub async fn mark_viewed(pool: &SqlitePool, unique_link_id: &str) -> Result<bool> {
    let now = time::to_storage(time::now());

    let result = sqlx::query(
        r#"
        UPDATE tracking_links
        SET status = CASE WHEN status = 'PENDING' THEN 'VIEWED' ELSE status END,
            viewed_at = ?,
            updated_at = ?
        WHERE unique_link_id = ? AND viewed_at IS NULL
        "#,
    )
    .bind(&now)
    .bind(&now)
    .bind(unique_link_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Completion update: sets COMPLETED and overwrites score, interactions,
/// and `completed_at`.
///
/// With `reject_if_completed` the update is additionally guarded on the
/// link not already being COMPLETED; returns whether a row was updated.
pub async fn mark_completed(
    tx: &mut Transaction<'_, Sqlite>,
    unique_link_id: &str,
    score: i64,
    interaction_data: &str,
    reject_if_completed: bool,
) -> Result<bool> {
    let now = time::to_storage(time::now());

    let sql = if reject_if_completed {
        r#"
        UPDATE tracking_links
        SET status = 'COMPLETED', score = ?, interaction_data = ?, completed_at = ?, updated_at = ?
        WHERE unique_link_id = ? AND status != 'COMPLETED'
        "#
    } else {
        r#"
        UPDATE tracking_links
        SET status = 'COMPLETED', score = ?, interaction_data = ?, completed_at = ?, updated_at = ?
        WHERE unique_link_id = ?
        "#
    };

    let result = sqlx::query(sql)
        .bind(score)
        .bind(interaction_data)
        .bind(&now)
        .bind(&now)
        .bind(unique_link_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Resolve a public token to the link plus the content fields the launch
/// page renders
pub async fn get_launch_context(
    pool: &SqlitePool,
    unique_link_id: &str,
) -> Result<Option<LaunchContext>> {
    let row = sqlx::query(
        r#"
        SELECT tl.id, tl.recipient_id, tl.content_id, tl.unique_link_id, tl.status,
               tl.score, tl.interaction_data, tl.created_at, tl.viewed_at,
               tl.completed_at, tl.updated_at,
               c.title AS content_title,
               c.upload_type AS content_upload_type,
               c.content_identifier AS content_identifier
        FROM tracking_links tl
        JOIN content c ON tl.content_id = c.id
        WHERE tl.unique_link_id = ?
        "#,
    )
    .bind(unique_link_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let upload_type: String = row.get("content_upload_type");
        let context = LaunchContext {
            content_title: row.get("content_title"),
            upload_type: UploadKind::parse(&upload_type).ok_or_else(|| {
                Error::Internal(format!("Unknown upload_type '{}'", upload_type))
            })?,
            content_identifier: row.get("content_identifier"),
            link: row_to_link(row)?,
        };
        Ok(context)
    })
    .transpose()
}

fn row_to_link(row: sqlx::sqlite::SqliteRow) -> Result<TrackingLink> {
    let status: String = row.get("status");
    let interaction_data: String = row.get("interaction_data");
    let created_at: String = row.get("created_at");
    let viewed_at: Option<String> = row.get("viewed_at");
    let completed_at: Option<String> = row.get("completed_at");
    let updated_at: String = row.get("updated_at");

    Ok(TrackingLink {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        content_id: row.get("content_id"),
        unique_link_id: row.get("unique_link_id"),
        status: LinkStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("Unknown link status '{}'", status)))?,
        score: row.get("score"),
        interaction_data: serde_json::from_str(&interaction_data)
            .map_err(|e| Error::Internal(format!("Malformed interaction_data: {}", e)))?,
        created_at: super::parse_ts(&created_at)?,
        viewed_at: super::parse_opt_ts(viewed_at)?,
        completed_at: super::parse_opt_ts(completed_at)?,
        updated_at: super::parse_ts(&updated_at)?,
    })
}
