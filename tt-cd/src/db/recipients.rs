//! Recipient lookups
//!
//! Recipient CRUD belongs to the surrounding account system; this service
//! only validates existence and reads display fields.

use sqlx::{Row, SqlitePool};
use tt_common::Result;

use crate::models::Recipient;

/// Fetch one recipient
pub async fn get_recipient(pool: &SqlitePool, recipient_id: i64) -> Result<Option<Recipient>> {
    let row = sqlx::query(
        "SELECT id, account_id, email, first_name, last_name, created_at FROM recipients WHERE id = ?",
    )
    .bind(recipient_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let created_at: String = row.get("created_at");
        Ok(Recipient {
            id: row.get("id"),
            account_id: row.get("account_id"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            created_at: super::parse_ts(&created_at)?,
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_common::db::init_memory_database;
    use tt_common::time;

    #[tokio::test]
    async fn test_get_recipient() {
        let pool = init_memory_database().await.unwrap();
        let now = time::to_storage(time::now());
        sqlx::query("INSERT INTO accounts (name, created_at) VALUES ('acme', ?)")
            .bind(&now)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO recipients (account_id, email, first_name, last_name, created_at) VALUES (1, 'pat@example.com', 'Pat', 'Reyes', ?)",
        )
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        let recipient = get_recipient(&pool, 1).await.unwrap().unwrap();
        assert_eq!(recipient.email, "pat@example.com");
        assert_eq!(recipient.display_name(), "Pat Reyes");

        assert!(get_recipient(&pool, 2).await.unwrap().is_none());
    }
}
