//! Repository for merchant rows
//!
//! Merchants are created by admin action and mutated by admin edits and by
//! sync completion (last-sync timestamp). They are deactivated rather than
//! hard-deleted while products still reference them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};

use crate::domain::StoreInfo;
use crate::domain::entities::Merchant;

/// Fields supplied when an admin registers or edits a merchant.
#[derive(Debug, Clone)]
pub struct NewMerchant {
    pub name: String,
    pub website_url: String,
    pub catalog_url: Option<String>,
    pub sync_interval_minutes: i64,
}

#[derive(Clone)]
pub struct MerchantRepository {
    pool: Arc<SqlitePool>,
}

impl MerchantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn create(&self, merchant: &NewMerchant) -> sqlx::Result<Merchant> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO merchants (name, website_url, catalog_url, sync_interval_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&merchant.name)
        .bind(&merchant.website_url)
        .bind(&merchant.catalog_url)
        .bind(merchant.sync_interval_minutes)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<Merchant>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, website_url, catalog_url, sync_interval_minutes,
                   last_synced_at, is_active, created_at, updated_at
            FROM merchants WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(Self::row_to_merchant))
    }

    pub async fn find_all(&self) -> sqlx::Result<Vec<Merchant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, website_url, catalog_url, sync_interval_minutes,
                   last_synced_at, is_active, created_at, updated_at
            FROM merchants ORDER BY name
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_merchant).collect())
    }

    /// Active merchants, in scan order for the due check.
    pub async fn find_active(&self) -> sqlx::Result<Vec<Merchant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, website_url, catalog_url, sync_interval_minutes,
                   last_synced_at, is_active, created_at, updated_at
            FROM merchants WHERE is_active = 1 ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_merchant).collect())
    }

    pub async fn update(&self, id: i64, merchant: &NewMerchant) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE merchants
            SET name = ?, website_url = ?, catalog_url = ?, sync_interval_minutes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&merchant.name)
        .bind(&merchant.website_url)
        .bind(&merchant.catalog_url)
        .bind(merchant.sync_interval_minutes)
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn deactivate(&self, id: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE merchants SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Advances the last-sync timestamp. Called only from the success path of
    /// a sync attempt; failed attempts leave the merchant eligible for retry.
    pub async fn touch_last_synced(&self, id: i64, at: DateTime<Utc>) -> sqlx::Result<()> {
        sqlx::query("UPDATE merchants SET last_synced_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Matches a manually uploaded catalog to its merchant by website URL,
    /// creating the row on first sight. Runs inside the approval transaction.
    pub async fn upsert_from_store_info(
        conn: &mut SqliteConnection,
        store: &StoreInfo,
    ) -> sqlx::Result<i64> {
        let now = Utc::now();
        sqlx::query_scalar(
            r#"
            INSERT INTO merchants (name, website_url, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(website_url) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&store.name)
        .bind(&store.website_url)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
    }

    fn row_to_merchant(row: SqliteRow) -> Merchant {
        Merchant {
            id: row.get("id"),
            name: row.get("name"),
            website_url: row.get("website_url"),
            catalog_url: row.get("catalog_url"),
            sync_interval_minutes: row.get("sync_interval_minutes"),
            last_synced_at: row.get("last_synced_at"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use tempfile::{TempDir, tempdir};

    async fn test_repo() -> (TempDir, MerchantRepository) {
        let temp_dir = tempdir().unwrap();
        let url = format!("sqlite:{}", temp_dir.path().join("merchants.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        (temp_dir, MerchantRepository::new(db.pool().clone()))
    }

    fn sample_merchant() -> NewMerchant {
        NewMerchant {
            name: "Nord Outfitters".to_string(),
            website_url: "https://nord.example.com".to_string(),
            catalog_url: Some("https://nord.example.com/catalog.json".to_string()),
            sync_interval_minutes: 60,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_merchant() {
        let (_dir, repo) = test_repo().await;
        let created = repo.create(&sample_merchant()).await.unwrap();

        assert_eq!(created.name, "Nord Outfitters");
        assert!(created.is_active);
        assert!(created.last_synced_at.is_none());
        assert_eq!(created.sync_interval_minutes, 60);

        let fetched = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.website_url, created.website_url);
    }

    #[tokio::test]
    async fn touch_last_synced_advances_timestamp() {
        let (_dir, repo) = test_repo().await;
        let merchant = repo.create(&sample_merchant()).await.unwrap();

        let at = Utc::now();
        repo.touch_last_synced(merchant.id, at).await.unwrap();

        let fetched = repo.find_by_id(merchant.id).await.unwrap().unwrap();
        let stored = fetched.last_synced_at.unwrap();
        assert!((stored - at).num_seconds().abs() < 2);
    }

    #[tokio::test]
    async fn deactivated_merchants_leave_the_scan_set() {
        let (_dir, repo) = test_repo().await;
        let merchant = repo.create(&sample_merchant()).await.unwrap();
        assert_eq!(repo.find_active().await.unwrap().len(), 1);

        repo.deactivate(merchant.id).await.unwrap();
        assert!(repo.find_active().await.unwrap().is_empty());
        // Still present for admin listings
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_from_store_info_is_idempotent_per_website() {
        let (_dir, repo) = test_repo().await;
        let store = StoreInfo {
            name: "Nord Outfitters".to_string(),
            website_url: "https://nord.example.com".to_string(),
            logo_url: None,
            description: None,
        };

        let mut conn = repo.pool.acquire().await.unwrap();
        let first = MerchantRepository::upsert_from_store_info(&mut conn, &store)
            .await
            .unwrap();
        let renamed = StoreInfo { name: "Nord Outfitters AB".to_string(), ..store };
        let second = MerchantRepository::upsert_from_store_info(&mut conn, &renamed)
            .await
            .unwrap();
        assert_eq!(first, second);

        let merchant = repo.find_by_id(first).await.unwrap().unwrap();
        assert_eq!(merchant.name, "Nord Outfitters AB");
    }
}
