//! Taxonomy cache and mapper
//!
//! Maps raw catalog labels (category, color, size) onto stable identifiers in
//! the shared taxonomy tables. The in-memory maps are an optimization only:
//! the source of truth is a single conditional upsert at the storage layer,
//! so concurrent resolvers of the same normalized label converge on one row.
//!
//! Each cache is an explicitly-owned instance injected into the reconciler,
//! not a process-wide singleton, so tests can build one per case.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::debug;

/// Taxonomy dimensions shared by every merchant's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyDimension {
    Category,
    Color,
    Size,
}

impl TaxonomyDimension {
    pub fn table(&self) -> &'static str {
        match self {
            TaxonomyDimension::Category => "categories",
            TaxonomyDimension::Color => "colors",
            TaxonomyDimension::Size => "sizes",
        }
    }
}

impl std::fmt::Display for TaxonomyDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxonomyDimension::Category => write!(f, "category"),
            TaxonomyDimension::Color => write!(f, "color"),
            TaxonomyDimension::Size => write!(f, "size"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// The conditional upsert neither inserted nor found a row. Should not
    /// happen; surfaced as a retryable storage error instead of panicking.
    #[error("mapping conflict resolving {dimension} label '{label}'")]
    MappingConflict { dimension: String, label: String },
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// In-memory mapping of normalized labels to row ids, backed by the shared
/// taxonomy tables.
pub struct TaxonomyCache {
    pool: SqlitePool,
    categories: RwLock<HashMap<String, i64>>,
    colors: RwLock<HashMap<String, i64>>,
    sizes: RwLock<HashMap<String, i64>>,
}

impl TaxonomyCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            categories: RwLock::new(HashMap::new()),
            colors: RwLock::new(HashMap::new()),
            sizes: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds the in-memory maps from the store. Called once at startup; a
    /// cold cache still resolves correctly, just with more round trips.
    pub async fn warm(&self) -> Result<(), sqlx::Error> {
        for dimension in [
            TaxonomyDimension::Category,
            TaxonomyDimension::Color,
            TaxonomyDimension::Size,
        ] {
            let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
                "SELECT name_norm, id FROM {}",
                dimension.table()
            ))
            .fetch_all(&self.pool)
            .await?;

            let mut map = self.map_for(dimension).write().await;
            for (name_norm, id) in rows {
                map.insert(name_norm, id);
            }
            debug!("taxonomy cache warmed: {} {} labels", map.len(), dimension);
        }
        Ok(())
    }

    /// Resolves a raw label to its stable identifier, creating the canonical
    /// row on first use. A missing or empty label is a legitimate "no value".
    pub async fn resolve(
        &self,
        dimension: TaxonomyDimension,
        raw_label: &str,
    ) -> Result<Option<i64>, TaxonomyError> {
        let display = raw_label.trim();
        if display.is_empty() {
            return Ok(None);
        }
        let norm = display.to_lowercase();

        if let Some(id) = self.map_for(dimension).read().await.get(&norm) {
            return Ok(Some(*id));
        }

        let id = self.upsert_row(dimension, display, &norm).await?;
        self.map_for(dimension).write().await.insert(norm, id);
        Ok(Some(id))
    }

    /// Insert-if-absent as one atomic statement. The no-op update arm exists
    /// so RETURNING yields the existing row's id on conflict.
    async fn upsert_row(
        &self,
        dimension: TaxonomyDimension,
        display: &str,
        norm: &str,
    ) -> Result<i64, TaxonomyError> {
        let now = chrono::Utc::now();
        let id: Option<i64> = match dimension {
            TaxonomyDimension::Color => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO colors (name, name_norm, hex_code, created_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(name_norm) DO UPDATE SET name_norm = excluded.name_norm
                    RETURNING id
                    "#,
                )
                .bind(display)
                .bind(norm)
                .bind(hex_for_color(norm))
                .bind(now)
                .fetch_optional(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_scalar(&format!(
                    r#"
                    INSERT INTO {} (name, name_norm, created_at)
                    VALUES (?, ?, ?)
                    ON CONFLICT(name_norm) DO UPDATE SET name_norm = excluded.name_norm
                    RETURNING id
                    "#,
                    dimension.table()
                ))
                .bind(display)
                .bind(norm)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        id.ok_or_else(|| TaxonomyError::MappingConflict {
            dimension: dimension.to_string(),
            label: display.to_string(),
        })
    }

    fn map_for(&self, dimension: TaxonomyDimension) -> &RwLock<HashMap<String, i64>> {
        match dimension {
            TaxonomyDimension::Category => &self.categories,
            TaxonomyDimension::Color => &self.colors,
            TaxonomyDimension::Size => &self.sizes,
        }
    }
}

/// Hex codes for color names that show up in practically every apparel feed.
/// Unknown colors keep a NULL hex code until curated.
fn hex_for_color(norm: &str) -> Option<&'static str> {
    match norm {
        "black" => Some("#000000"),
        "white" => Some("#FFFFFF"),
        "red" => Some("#FF0000"),
        "green" => Some("#008000"),
        "blue" => Some("#0000FF"),
        "navy" => Some("#000080"),
        "yellow" => Some("#FFFF00"),
        "orange" => Some("#FFA500"),
        "pink" => Some("#FFC0CB"),
        "purple" => Some("#800080"),
        "brown" => Some("#A52A2A"),
        "beige" => Some("#F5F5DC"),
        "grey" | "gray" => Some("#808080"),
        _ => None,
    }
}
