//! Append-only ledger of synchronization attempts
//!
//! One row per attempt, inserted as `in_progress` before any fetch happens
//! and updated exactly once to a terminal state. Terminal rows are never
//! mutated again; the guard clause on the updates enforces that.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::domain::entities::{SyncLog, SyncStatus};

#[derive(Clone)]
pub struct SyncLogRepository {
    pool: Arc<SqlitePool>,
}

impl SyncLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Opens the ledger row for a new attempt. Runs before the fetch so even
    /// a crash mid-sync leaves a visible `in_progress` record.
    pub async fn start_attempt(
        &self,
        merchant_id: i64,
        started_at: DateTime<Utc>,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            r#"
            INSERT INTO sync_logs (merchant_id, status, started_at)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(merchant_id)
        .bind(SyncStatus::InProgress)
        .bind(started_at)
        .fetch_one(&*self.pool)
        .await
    }

    /// Marks an attempt successful. Returns false if the row already reached
    /// a terminal state, in which case nothing is written.
    pub async fn complete_success(
        &self,
        log_id: i64,
        products_updated: i64,
        completed_at: DateTime<Utc>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sync_logs
            SET status = ?, products_updated = ?, completed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(SyncStatus::Success)
        .bind(products_updated)
        .bind(completed_at)
        .bind(log_id)
        .bind(SyncStatus::InProgress)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Marks an attempt failed with a human-readable cause.
    pub async fn complete_error(
        &self,
        log_id: i64,
        message: &str,
        completed_at: DateTime<Utc>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sync_logs
            SET status = ?, error_message = ?, completed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(SyncStatus::Error)
        .bind(message)
        .bind(completed_at)
        .bind(log_id)
        .bind(SyncStatus::InProgress)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<SyncLog>> {
        let row = sqlx::query(
            r#"
            SELECT id, merchant_id, status, products_updated, error_message, started_at, completed_at
            FROM sync_logs WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(Self::row_to_log))
    }

    pub async fn recent_for_merchant(
        &self,
        merchant_id: i64,
        limit: i64,
    ) -> sqlx::Result<Vec<SyncLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, merchant_id, status, products_updated, error_message, started_at, completed_at
            FROM sync_logs WHERE merchant_id = ?
            ORDER BY started_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(merchant_id)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_log).collect())
    }

    pub async fn recent(&self, limit: i64) -> sqlx::Result<Vec<SyncLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, merchant_id, status, products_updated, error_message, started_at, completed_at
            FROM sync_logs
            ORDER BY started_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_log).collect())
    }

    fn row_to_log(row: SqliteRow) -> SyncLog {
        SyncLog {
            id: row.get("id"),
            merchant_id: row.get("merchant_id"),
            status: row.get("status"),
            products_updated: row.get("products_updated"),
            error_message: row.get("error_message"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use crate::infrastructure::merchant_repository::{MerchantRepository, NewMerchant};
    use tempfile::{TempDir, tempdir};

    async fn fixture() -> (TempDir, SyncLogRepository, i64) {
        let temp_dir = tempdir().unwrap();
        let url = format!("sqlite:{}", temp_dir.path().join("logs.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        let merchant = MerchantRepository::new(db.pool().clone())
            .create(&NewMerchant {
                name: "Nord Outfitters".to_string(),
                website_url: "https://nord.example.com".to_string(),
                catalog_url: None,
                sync_interval_minutes: 60,
            })
            .await
            .unwrap();
        (temp_dir, SyncLogRepository::new(db.pool().clone()), merchant.id)
    }

    #[tokio::test]
    async fn attempt_lifecycle_success() {
        let (_dir, repo, merchant_id) = fixture().await;
        let log_id = repo.start_attempt(merchant_id, Utc::now()).await.unwrap();

        let log = repo.find_by_id(log_id).await.unwrap().unwrap();
        assert_eq!(log.status, SyncStatus::InProgress);
        assert!(log.completed_at.is_none());

        assert!(repo.complete_success(log_id, 42, Utc::now()).await.unwrap());
        let log = repo.find_by_id(log_id).await.unwrap().unwrap();
        assert_eq!(log.status, SyncStatus::Success);
        assert_eq!(log.products_updated, 42);
        assert!(log.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_rows_are_never_mutated_again() {
        let (_dir, repo, merchant_id) = fixture().await;
        let log_id = repo.start_attempt(merchant_id, Utc::now()).await.unwrap();

        assert!(repo.complete_error(log_id, "upstream timed out", Utc::now()).await.unwrap());
        // A second terminal write is refused
        assert!(!repo.complete_success(log_id, 5, Utc::now()).await.unwrap());
        assert!(!repo.complete_error(log_id, "other", Utc::now()).await.unwrap());

        let log = repo.find_by_id(log_id).await.unwrap().unwrap();
        assert_eq!(log.status, SyncStatus::Error);
        assert_eq!(log.error_message.as_deref(), Some("upstream timed out"));
        assert_eq!(log.products_updated, 0);
    }

    #[tokio::test]
    async fn ledger_keeps_one_row_per_attempt() {
        let (_dir, repo, merchant_id) = fixture().await;
        for _ in 0..3 {
            let id = repo.start_attempt(merchant_id, Utc::now()).await.unwrap();
            repo.complete_success(id, 1, Utc::now()).await.unwrap();
        }

        let logs = repo.recent_for_merchant(merchant_id, 10).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(repo.recent(2).await.unwrap().len(), 2);
    }
}
