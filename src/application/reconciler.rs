//! Product reconciler
//!
//! Takes a validated catalog and a merchant identity and decides, per item,
//! whether to create or refresh a canonical product, then rewrites the
//! item's price rows. Work is split into a map phase (taxonomy resolution,
//! no transaction held) and an import phase that runs inside one transaction
//! per merchant, so a failure partway through never leaves a half-written
//! catalog.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::application::SyncError;
use crate::domain::catalog::{Catalog, CatalogItem};
use crate::domain::entities::StockStatus;
use crate::infrastructure::product_repository::{NewPrice, NewProduct, ProductRepository};
use crate::infrastructure::taxonomy_cache::{TaxonomyCache, TaxonomyDimension};

/// How existing rows are treated when a catalog is imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Upsert products in place and supersede their price rows.
    Refresh,
    /// Purge all of the merchant's products and prices first, then reimport.
    /// Used by explicit admin-triggered resyncs.
    FullResync,
}

/// Identity and mode for one reconciliation run.
#[derive(Debug, Clone)]
pub struct MerchantContext {
    pub merchant_id: i64,
    pub mode: ImportMode,
}

/// Counters accumulated across one reconciliation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    pub products_processed: u32,
    pub products_created: u32,
    pub prices_written: u32,
}

/// A catalog item after taxonomy resolution, ready for transactional import.
/// The merchant is attached at import time because the manual-upload path
/// only learns its merchant id inside the approval transaction.
pub struct MappedItem {
    name: String,
    brand: String,
    description: Option<String>,
    image_url: Option<String>,
    product_url: Option<String>,
    category_id: Option<i64>,
    rows: Vec<NewPrice>,
}

pub struct ProductReconciler {
    pool: SqlitePool,
    taxonomy: Arc<TaxonomyCache>,
}

impl ProductReconciler {
    pub fn new(pool: SqlitePool, taxonomy: Arc<TaxonomyCache>) -> Self {
        Self { pool, taxonomy }
    }

    /// Reconciles a whole catalog for one merchant. Purge (for full resync)
    /// and reimport commit or roll back together.
    pub async fn reconcile(
        &self,
        catalog: &Catalog,
        ctx: &MerchantContext,
    ) -> Result<ReconcileOutcome, SyncError> {
        let mapped = self.map_items(&catalog.products).await?;

        let mut tx = self.pool.begin().await?;
        if ctx.mode == ImportMode::FullResync {
            let purged = ProductRepository::purge_merchant(&mut tx, ctx.merchant_id).await?;
            info!(
                "🔄 full resync: purged {} products for merchant {}",
                purged, ctx.merchant_id
            );
        }
        let outcome = Self::import_items(&mut tx, ctx.merchant_id, &mapped).await?;
        tx.commit().await?;

        info!(
            "✅ reconciled merchant {}: {} products ({} new), {} price rows",
            ctx.merchant_id, outcome.products_processed, outcome.products_created, outcome.prices_written
        );
        Ok(outcome)
    }

    /// Map phase: resolves taxonomy labels and expands variant combinations.
    /// Runs before the import transaction opens so no lock is held across
    /// storage round trips.
    pub(crate) async fn map_items(
        &self,
        items: &[CatalogItem],
    ) -> Result<Vec<MappedItem>, SyncError> {
        let mut mapped = Vec::with_capacity(items.len());

        for item in items {
            let Some(item_price) = item.price else {
                // Validated catalogs always carry a price; tolerate stray
                // entries rather than failing the whole merchant.
                warn!("skipping catalog item '{}' without a usable price", item.name);
                continue;
            };

            let category_id = self
                .taxonomy
                .resolve(TaxonomyDimension::Category, item.category.as_deref().unwrap_or(""))
                .await?;

            let rows = self.map_price_rows(item, item_price).await?;

            mapped.push(MappedItem {
                name: item.name.trim().to_string(),
                brand: item.brand.as_deref().unwrap_or("").trim().to_string(),
                description: item.description.clone(),
                image_url: item.image_url.clone(),
                product_url: Some(item.url.clone()),
                category_id,
                rows,
            });
        }

        Ok(mapped)
    }

    /// Expands an item into its size/color/price combinations. Feeds send
    /// explicit variants, a flat size list, or nothing; every shape yields at
    /// least one price row.
    async fn map_price_rows(
        &self,
        item: &CatalogItem,
        item_price: f64,
    ) -> Result<Vec<NewPrice>, SyncError> {
        let item_color = item.color.as_deref().unwrap_or("");
        let mut rows = Vec::new();

        if !item.variants.is_empty() {
            for variant in &item.variants {
                let price = variant.price.unwrap_or(item_price);
                let original_price = variant
                    .original_price
                    .or(item.original_price)
                    .unwrap_or(price);
                let stock_status = StockStatus::from_label(
                    variant
                        .stock_status
                        .as_deref()
                        .or(item.stock_status.as_deref()),
                );
                let size_id = self
                    .taxonomy
                    .resolve(TaxonomyDimension::Size, variant.size.as_deref().unwrap_or(""))
                    .await?;
                let color_id = self
                    .taxonomy
                    .resolve(
                        TaxonomyDimension::Color,
                        variant.color.as_deref().unwrap_or(item_color),
                    )
                    .await?;

                rows.push(NewPrice {
                    size_id,
                    color_id,
                    price,
                    original_price,
                    stock_status,
                });
            }
            return Ok(rows);
        }

        let original_price = item.original_price.unwrap_or(item_price);
        let stock_status = StockStatus::from_label(item.stock_status.as_deref());
        let color_id = self
            .taxonomy
            .resolve(TaxonomyDimension::Color, item_color)
            .await?;

        if item.sizes.is_empty() {
            rows.push(NewPrice {
                size_id: None,
                color_id,
                price: item_price,
                original_price,
                stock_status,
            });
        } else {
            for size in &item.sizes {
                let size_id = self.taxonomy.resolve(TaxonomyDimension::Size, size).await?;
                rows.push(NewPrice {
                    size_id,
                    color_id,
                    price: item_price,
                    original_price,
                    stock_status,
                });
            }
        }

        Ok(rows)
    }

    /// Import phase: upserts products by the canonical (merchant, name, brand)
    /// key and supersedes their price rows. Callers own the transaction.
    pub(crate) async fn import_items(
        conn: &mut SqliteConnection,
        merchant_id: i64,
        items: &[MappedItem],
    ) -> Result<ReconcileOutcome, sqlx::Error> {
        let mut outcome = ReconcileOutcome::default();

        for item in items {
            let product = NewProduct {
                merchant_id,
                name: item.name.clone(),
                brand: item.brand.clone(),
                description: item.description.clone(),
                image_url: item.image_url.clone(),
                product_url: item.product_url.clone(),
                category_id: item.category_id,
            };

            let product_id =
                match ProductRepository::find_id_by_key(conn, merchant_id, &item.name, &item.brand)
                    .await?
                {
                    Some(id) => {
                        ProductRepository::update_product(conn, id, &product).await?;
                        id
                    }
                    None => {
                        outcome.products_created += 1;
                        ProductRepository::insert_product(conn, &product).await?
                    }
                };

            ProductRepository::delete_prices_for_product(conn, product_id).await?;
            for row in &item.rows {
                ProductRepository::insert_price(conn, product_id, row).await?;
                outcome.prices_written += 1;
            }

            outcome.products_processed += 1;
        }

        Ok(outcome)
    }
}
