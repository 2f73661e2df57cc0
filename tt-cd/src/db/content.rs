//! Content item queries

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tt_common::{time, Error, Result};

use crate::models::{ContentItem, UploadKind};

/// Fields for a new content row; the locator starts out as "pending"
#[derive(Debug)]
pub struct NewContent<'a> {
    pub account_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub content_type: &'a str,
    pub upload_type: UploadKind,
    pub content_identifier: &'a str,
}

/// Insert a content row, returning its id
pub async fn insert_content(pool: &SqlitePool, new: &NewContent<'_>) -> Result<i64> {
    let now = time::to_storage(time::now());

    let result = sqlx::query(
        r#"
        INSERT INTO content
            (account_id, title, description, content_type, upload_type, content_identifier, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.account_id)
    .bind(new.title)
    .bind(new.description)
    .bind(new.content_type)
    .bind(new.upload_type.as_str())
    .bind(new.content_identifier)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch one content item
pub async fn get_content(pool: &SqlitePool, content_id: i64) -> Result<Option<ContentItem>> {
    let row = sqlx::query(
        r#"
        SELECT id, account_id, title, description, content_type, upload_type,
               content_identifier, created_at, updated_at
        FROM content
        WHERE id = ?
        "#,
    )
    .bind(content_id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_content).transpose()
}

/// Resolve the content locator to the servable artifact path.
///
/// Runs inside the ingestion transaction so a failed pipeline leaves the
/// locator at "pending".
pub async fn set_content_identifier(
    tx: &mut Transaction<'_, Sqlite>,
    content_id: i64,
    identifier: &str,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE content SET content_identifier = ?, updated_at = ? WHERE id = ?",
    )
    .bind(identifier)
    .bind(time::to_storage(time::now()))
    .bind(content_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Content {} not found", content_id)));
    }
    Ok(())
}

fn row_to_content(row: sqlx::sqlite::SqliteRow) -> Result<ContentItem> {
    let upload_type: String = row.get("upload_type");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(ContentItem {
        id: row.get("id"),
        account_id: row.get("account_id"),
        title: row.get("title"),
        description: row.get("description"),
        content_type: row.get("content_type"),
        upload_type: UploadKind::parse(&upload_type)
            .ok_or_else(|| Error::Internal(format!("Unknown upload_type '{}'", upload_type)))?,
        content_identifier: row.get("content_identifier"),
        created_at: super::parse_ts(&created_at)?,
        updated_at: super::parse_ts(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_common::db::init_memory_database;

    async fn pool_with_account() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO accounts (name, created_at) VALUES ('acme', ?)")
            .bind(time::to_storage(time::now()))
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_fetch_content() {
        let pool = pool_with_account().await;

        let id = insert_content(
            &pool,
            &NewContent {
                account_id: 1,
                title: "Phishing Basics",
                description: "Spot the bait",
                content_type: "training",
                upload_type: UploadKind::RawHtml,
                content_identifier: "pending",
            },
        )
        .await
        .unwrap();

        let item = get_content(&pool, id).await.unwrap().unwrap();
        assert_eq!(item.title, "Phishing Basics");
        assert_eq!(item.upload_type, UploadKind::RawHtml);
        assert!(!item.is_ingested());
        assert!(get_content(&pool, id + 50).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_content_identifier_requires_existing_row() {
        let pool = pool_with_account().await;

        let mut tx = pool.begin().await.unwrap();
        let missing = set_content_identifier(&mut tx, 404, "1/launch.html").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
        tx.rollback().await.unwrap();

        let id = insert_content(
            &pool,
            &NewContent {
                account_id: 1,
                title: "T",
                description: "",
                content_type: "training",
                upload_type: UploadKind::HtmlZip,
                content_identifier: "pending",
            },
        )
        .await
        .unwrap();

        let mut tx = pool.begin().await.unwrap();
        set_content_identifier(&mut tx, id, "7/launch.html").await.unwrap();
        tx.commit().await.unwrap();

        let item = get_content(&pool, id).await.unwrap().unwrap();
        assert_eq!(item.content_identifier, "7/launch.html");
        assert!(item.is_ingested());
    }
}
