//! Topic catalogue and content-topic associations

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tt_common::{time, Result};

/// A catalogue entry with the number of content items carrying the topic
#[derive(Debug, Clone, serde::Serialize)]
pub struct TopicCount {
    pub name: String,
    pub content_count: i64,
}

/// Insert the topic if new, returning its id either way
pub async fn ensure_topic(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO topics (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(time::to_storage(time::now()))
        .execute(&mut **tx)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM topics WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

    Ok(id)
}

/// Associate a content item with a topic (idempotent on duplicates)
pub async fn associate_content_topic(
    tx: &mut Transaction<'_, Sqlite>,
    content_id: i64,
    topic_id: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO content_topics (content_id, topic_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(content_id)
    .bind(topic_id)
    .bind(time::to_storage(time::now()))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Names of topics associated with a content item, in name order
pub async fn topics_for_content<'e, E>(executor: E, content_id: i64) -> Result<Vec<String>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT t.name
        FROM topics t
        JOIN content_topics ct ON ct.topic_id = t.id
        WHERE ct.content_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(content_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("name")).collect())
}

/// Full topic catalogue with per-topic content counts
pub async fn list_topics(pool: &SqlitePool) -> Result<Vec<TopicCount>> {
    let rows = sqlx::query(
        r#"
        SELECT t.name, COUNT(ct.content_id) AS content_count
        FROM topics t
        LEFT JOIN content_topics ct ON ct.topic_id = t.id
        GROUP BY t.id
        ORDER BY t.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TopicCount {
            name: row.get("name"),
            content_count: row.get("content_count"),
        })
        .collect())
}
