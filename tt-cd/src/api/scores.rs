//! Per-recipient topic score report

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{recipients, scores};
use crate::error::{ApiError, ApiResult};
use crate::models::TopicScore;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RecipientSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// One aggregated (recipient, topic) row with its derived rate
#[derive(Debug, Serialize)]
pub struct TopicScoreRow {
    pub topic_name: String,
    pub score: i64,
    pub attempts: i64,
    /// Percentage of attempts that passed, two decimal places
    pub success_rate: f64,
    pub last_updated_at: DateTime<Utc>,
}

/// Aggregate statistics across every topic the recipient attempted
#[derive(Debug, Serialize)]
pub struct ScoreStatistics {
    pub total_topics_attempted: usize,
    pub total_score: i64,
    pub total_attempts: i64,
    pub overall_success_rate: f64,
}

/// GET /api/recipients/{id}/scores response
#[derive(Debug, Serialize)]
pub struct RecipientScoresResponse {
    pub recipient: RecipientSummary,
    pub topic_scores: Vec<TopicScoreRow>,
    pub statistics: ScoreStatistics,
}

/// GET /api/recipients/{id}/scores
///
/// Topic rows are ordered most recently updated first. Under the default
/// scoring policy only passing completions are recorded, so every rate
/// reads 100% (see ScoringPolicy.count_failed_attempts).
pub async fn get_recipient_scores(
    State(state): State<AppState>,
    Path(recipient_id): Path<i64>,
) -> ApiResult<Json<RecipientScoresResponse>> {
    let recipient = recipients::get_recipient(&state.db, recipient_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recipient {} not found", recipient_id)))?;

    let rows = scores::scores_for_recipient(&state.db, recipient_id).await?;

    let total_score: i64 = rows.iter().map(|row| row.score).sum();
    let total_attempts: i64 = rows.iter().map(|row| row.attempts).sum();
    let statistics = ScoreStatistics {
        total_topics_attempted: rows.len(),
        total_score,
        total_attempts,
        overall_success_rate: if total_attempts == 0 {
            0.0
        } else {
            round_percent(total_score as f64 / total_attempts as f64)
        },
    };

    Ok(Json(RecipientScoresResponse {
        recipient: RecipientSummary {
            id: recipient.id,
            name: recipient.display_name(),
            email: recipient.email,
        },
        topic_scores: rows.into_iter().map(score_row).collect(),
        statistics,
    }))
}

fn score_row(row: TopicScore) -> TopicScoreRow {
    TopicScoreRow {
        success_rate: row.success_rate().map(round_percent).unwrap_or(0.0),
        topic_name: row.topic_name,
        score: row.score,
        attempts: row.attempts,
        last_updated_at: row.last_updated_at,
    }
}

/// 0.0-1.0 rate to a percentage rounded to two decimal places
fn round_percent(rate: f64) -> f64 {
    (rate * 10_000.0).round() / 100.0
}

/// Build score report routes
pub fn score_routes() -> Router<AppState> {
    Router::new().route("/api/recipients/:id/scores", get(get_recipient_scores))
}
