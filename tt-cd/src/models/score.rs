//! Per-recipient topic score aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated counters for one (recipient, topic) pair
///
/// `score` counts passing completions attributing the topic; `attempts`
/// counts completions recorded against it at all. Under the default
/// scoring policy only passing completions are recorded, so the two move
/// in lockstep (see `ScoringPolicy.count_failed_attempts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScore {
    pub recipient_id: i64,
    pub topic_name: String,
    pub score: i64,
    pub attempts: i64,
    pub last_updated_at: DateTime<Utc>,
}

impl TopicScore {
    /// Fraction of recorded attempts that passed, `None` with no attempts
    pub fn success_rate(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.score as f64 / self.attempts as f64)
        }
    }
}
