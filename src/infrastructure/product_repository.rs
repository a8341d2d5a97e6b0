//! Repository for canonical products and their price rows
//!
//! Write operations take an explicit connection so the reconciler can scope
//! them to one transaction per merchant; reads go through the shared pool.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};

use crate::domain::entities::{PriceEntry, Product, StockStatus};

/// Fields written when a catalog item is inserted or refreshed.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub merchant_id: i64,
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub category_id: Option<i64>,
}

/// One price row to insert for a product.
#[derive(Debug, Clone)]
pub struct NewPrice {
    pub size_id: Option<i64>,
    pub color_id: Option<i64>,
    pub price: f64,
    pub original_price: f64,
    pub stock_status: StockStatus,
}

/// Aggregate counts for startup logging and admin dashboards.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogStatistics {
    pub total_merchants: i64,
    pub total_products: i64,
    pub total_prices: i64,
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: Arc<SqlitePool>,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    // ===============================
    // TRANSACTION-SCOPED WRITES
    // ===============================

    /// Looks up a product by the canonical matching key (merchant, name, brand).
    pub async fn find_id_by_key(
        conn: &mut SqliteConnection,
        merchant_id: i64,
        name: &str,
        brand: &str,
    ) -> sqlx::Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM products WHERE merchant_id = ? AND name = ? AND brand = ?")
            .bind(merchant_id)
            .bind(name)
            .bind(brand)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn insert_product(
        conn: &mut SqliteConnection,
        product: &NewProduct,
    ) -> sqlx::Result<i64> {
        let now = Utc::now();
        sqlx::query_scalar(
            r#"
            INSERT INTO products
            (merchant_id, name, brand, description, image_url, product_url, category_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(product.merchant_id)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.product_url)
        .bind(product.category_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
    }

    /// Refreshes the mutable fields of an existing product in place.
    pub async fn update_product(
        conn: &mut SqliteConnection,
        id: i64,
        product: &NewProduct,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET description = ?, image_url = ?, product_url = ?, category_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.product_url)
        .bind(product.category_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Supersedes a product's previous price rows before the fresh set is
    /// inserted, so repeated syncs do not accumulate duplicates.
    pub async fn delete_prices_for_product(
        conn: &mut SqliteConnection,
        product_id: i64,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM prices WHERE product_id = ?")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_price(
        conn: &mut SqliteConnection,
        product_id: i64,
        price: &NewPrice,
    ) -> sqlx::Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO prices
            (product_id, size_id, color_id, price, original_price, stock_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product_id)
        .bind(price.size_id)
        .bind(price.color_id)
        .bind(price.price)
        .bind(price.original_price)
        .bind(price.stock_status)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Full-resync purge: removes all of one merchant's prices and products.
    /// Runs inside the same transaction as the reimport so an interrupted
    /// resync never leaves the merchant half-emptied.
    pub async fn purge_merchant(
        conn: &mut SqliteConnection,
        merchant_id: i64,
    ) -> sqlx::Result<u64> {
        sqlx::query(
            "DELETE FROM prices WHERE product_id IN (SELECT id FROM products WHERE merchant_id = ?)",
        )
        .bind(merchant_id)
        .execute(&mut *conn)
        .await?;

        let result = sqlx::query("DELETE FROM products WHERE merchant_id = ?")
            .bind(merchant_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    // ===============================
    // POOL-LEVEL READS
    // ===============================

    pub async fn products_for_merchant(&self, merchant_id: i64) -> sqlx::Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, merchant_id, name, brand, description, image_url, product_url,
                   category_id, created_at, updated_at
            FROM products WHERE merchant_id = ? ORDER BY name, brand
            "#,
        )
        .bind(merchant_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_product).collect())
    }

    pub async fn prices_for_product(&self, product_id: i64) -> sqlx::Result<Vec<PriceEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, size_id, color_id, price, original_price, stock_status,
                   created_at, updated_at
            FROM prices WHERE product_id = ? ORDER BY id
            "#,
        )
        .bind(product_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PriceEntry {
                id: row.get("id"),
                product_id: row.get("product_id"),
                size_id: row.get("size_id"),
                color_id: row.get("color_id"),
                price: row.get("price"),
                original_price: row.get("original_price"),
                stock_status: row.get("stock_status"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    pub async fn count_products_for_merchant(&self, merchant_id: i64) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE merchant_id = ?")
            .bind(merchant_id)
            .fetch_one(&*self.pool)
            .await
    }

    pub async fn statistics(&self) -> sqlx::Result<CatalogStatistics> {
        let total_merchants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM merchants")
            .fetch_one(&*self.pool)
            .await?;
        let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await?;
        let total_prices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prices")
            .fetch_one(&*self.pool)
            .await?;

        Ok(CatalogStatistics {
            total_merchants,
            total_products,
            total_prices,
        })
    }

    fn row_to_product(row: SqliteRow) -> Product {
        Product {
            id: row.get("id"),
            merchant_id: row.get("merchant_id"),
            name: row.get("name"),
            brand: row.get("brand"),
            description: row.get("description"),
            image_url: row.get("image_url"),
            product_url: row.get("product_url"),
            category_id: row.get("category_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use crate::infrastructure::merchant_repository::{MerchantRepository, NewMerchant};
    use tempfile::{TempDir, tempdir};

    async fn fixture() -> (TempDir, SqlitePool, i64) {
        let temp_dir = tempdir().unwrap();
        let url = format!("sqlite:{}", temp_dir.path().join("products.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();

        let merchants = MerchantRepository::new(pool.clone());
        let merchant = merchants
            .create(&NewMerchant {
                name: "Nord Outfitters".to_string(),
                website_url: "https://nord.example.com".to_string(),
                catalog_url: None,
                sync_interval_minutes: 60,
            })
            .await
            .unwrap();
        (temp_dir, pool, merchant.id)
    }

    fn parka(merchant_id: i64) -> NewProduct {
        NewProduct {
            merchant_id,
            name: "Fjord Parka".to_string(),
            brand: "Nordkapp".to_string(),
            description: Some("Insulated shell".to_string()),
            image_url: None,
            product_url: Some("https://nord.example.com/p/fjord-parka".to_string()),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn insert_then_match_by_key() {
        let (_dir, pool, merchant_id) = fixture().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = ProductRepository::insert_product(&mut conn, &parka(merchant_id))
            .await
            .unwrap();
        let found = ProductRepository::find_id_by_key(&mut conn, merchant_id, "Fjord Parka", "Nordkapp")
            .await
            .unwrap();
        assert_eq!(found, Some(id));

        let missing = ProductRepository::find_id_by_key(&mut conn, merchant_id, "Fjord Parka", "")
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn price_rows_are_superseded_not_appended() {
        let (_dir, pool, merchant_id) = fixture().await;
        let repo = ProductRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let product_id = ProductRepository::insert_product(&mut conn, &parka(merchant_id))
            .await
            .unwrap();
        let price = NewPrice {
            size_id: None,
            color_id: None,
            price: 249.9,
            original_price: 299.9,
            stock_status: StockStatus::InStock,
        };
        ProductRepository::insert_price(&mut conn, product_id, &price).await.unwrap();
        ProductRepository::insert_price(&mut conn, product_id, &price).await.unwrap();

        let removed = ProductRepository::delete_prices_for_product(&mut conn, product_id)
            .await
            .unwrap();
        assert_eq!(removed, 2);
        ProductRepository::insert_price(&mut conn, product_id, &price).await.unwrap();
        drop(conn);

        let rows = repo.prices_for_product(product_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].original_price, 299.9);
        assert_eq!(rows[0].stock_status, StockStatus::InStock);
    }

    #[tokio::test]
    async fn purge_merchant_removes_products_and_prices() {
        let (_dir, pool, merchant_id) = fixture().await;
        let repo = ProductRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let product_id = ProductRepository::insert_product(&mut conn, &parka(merchant_id))
            .await
            .unwrap();
        ProductRepository::insert_price(
            &mut conn,
            product_id,
            &NewPrice {
                size_id: None,
                color_id: None,
                price: 10.0,
                original_price: 10.0,
                stock_status: StockStatus::InStock,
            },
        )
        .await
        .unwrap();

        let purged = ProductRepository::purge_merchant(&mut conn, merchant_id).await.unwrap();
        assert_eq!(purged, 1);
        drop(conn);

        assert!(repo.products_for_merchant(merchant_id).await.unwrap().is_empty());
        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.total_prices, 0);
        assert_eq!(stats.total_merchants, 1);
    }
}
