//! Repository for manually submitted catalog uploads
//!
//! Upload rows are created `pending` and flip to a terminal decision exactly
//! once. The decision update is guarded on the pending status so a repeated
//! or racing decision is refused rather than overwriting the first one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};

use crate::domain::entities::{CatalogUpload, UploadStatus};

#[derive(Clone)]
pub struct UploadRepository {
    pool: Arc<SqlitePool>,
}

impl UploadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn create(&self, file_path: &str, created_at: DateTime<Utc>) -> sqlx::Result<CatalogUpload> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO catalog_uploads (file_path, status, created_at)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(file_path)
        .bind(UploadStatus::Pending)
        .bind(created_at)
        .fetch_one(&*self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<CatalogUpload>> {
        let row = sqlx::query(
            r#"
            SELECT id, file_path, status, admin_notes, created_at, reviewed_at
            FROM catalog_uploads WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(Self::row_to_upload))
    }

    pub async fn list_pending(&self) -> sqlx::Result<Vec<CatalogUpload>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_path, status, admin_notes, created_at, reviewed_at
            FROM catalog_uploads WHERE status = ? ORDER BY created_at, id
            "#,
        )
        .bind(UploadStatus::Pending)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_upload).collect())
    }

    /// Records the admin decision. Returns false when the upload already left
    /// `pending`, leaving the earlier decision untouched. Takes a connection
    /// so approval can share the import transaction.
    pub async fn decide(
        conn: &mut SqliteConnection,
        id: i64,
        decision: UploadStatus,
        notes: Option<&str>,
        reviewed_at: DateTime<Utc>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_uploads
            SET status = ?, admin_notes = ?, reviewed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(decision)
        .bind(notes)
        .bind(reviewed_at)
        .bind(id)
        .bind(UploadStatus::Pending)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    fn row_to_upload(row: SqliteRow) -> CatalogUpload {
        CatalogUpload {
            id: row.get("id"),
            file_path: row.get("file_path"),
            status: row.get("status"),
            admin_notes: row.get("admin_notes"),
            created_at: row.get("created_at"),
            reviewed_at: row.get("reviewed_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use tempfile::{TempDir, tempdir};

    async fn fixture() -> (TempDir, SqlitePool, UploadRepository) {
        let temp_dir = tempdir().unwrap();
        let url = format!("sqlite:{}", temp_dir.path().join("uploads.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();
        (temp_dir, pool.clone(), UploadRepository::new(pool))
    }

    #[tokio::test]
    async fn uploads_start_pending() {
        let (_dir, _pool, repo) = fixture().await;
        let upload = repo.create("/uploads/abc.json", Utc::now()).await.unwrap();

        assert_eq!(upload.status, UploadStatus::Pending);
        assert!(upload.reviewed_at.is_none());
        assert_eq!(repo.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn decision_is_recorded_exactly_once() {
        let (_dir, pool, repo) = fixture().await;
        let upload = repo.create("/uploads/abc.json", Utc::now()).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let first = UploadRepository::decide(
            &mut conn,
            upload.id,
            UploadStatus::Rejected,
            Some("missing sizes on most items"),
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(first);

        let second = UploadRepository::decide(&mut conn, upload.id, UploadStatus::Approved, None, Utc::now())
            .await
            .unwrap();
        assert!(!second);
        drop(conn);

        let stored = repo.find_by_id(upload.id).await.unwrap().unwrap();
        assert_eq!(stored.status, UploadStatus::Rejected);
        assert_eq!(stored.admin_notes.as_deref(), Some("missing sizes on most items"));
        assert!(repo.list_pending().await.unwrap().is_empty());
    }
}
