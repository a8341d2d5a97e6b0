//! Persistent entities shared across the sync pipeline
//!
//! Contains the row types for merchants, canonical products, per-variant
//! prices, the shared taxonomy tables, the sync ledger and manual catalog
//! uploads, plus the status enums stored as TEXT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::{Decode, Encode, Type};

/// A merchant whose catalog endpoint is pulled on a configured cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: i64,
    pub name: String,
    pub website_url: String,
    /// Endpoint serving the merchant's raw JSON catalog. Merchants that only
    /// submit catalogs manually have no URL and are skipped by the due scan.
    pub catalog_url: Option<String>,
    pub sync_interval_minutes: i64,
    /// Advanced only when a sync attempt reaches terminal success.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical product record, matched across syncs by (merchant, name, brand).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub merchant_id: i64,
    pub name: String,
    /// Empty string when the feed carries no brand, so the matching key stays total.
    pub brand: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One size/color/price combination of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    pub id: i64,
    pub product_id: i64,
    pub size_id: Option<i64>,
    pub color_id: Option<i64>,
    pub price: f64,
    pub original_price: f64,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per synchronization attempt; never mutated after reaching a
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: i64,
    pub merchant_id: i64,
    pub status: SyncStatus,
    pub products_updated: i64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A manually submitted catalog awaiting an admin decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogUpload {
    pub id: i64,
    pub file_path: String,
    pub status: UploadStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Stock availability vocabulary, normalized from whatever wording a feed uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    ComingSoon,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::ComingSoon => "coming_soon",
        }
    }

    /// Maps a merchant's free-form stock wording onto the canonical enum.
    /// Unknown or absent wording counts as in stock.
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return StockStatus::InStock;
        };
        let norm: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match norm.as_str() {
            "outofstock" | "soldout" | "unavailable" | "agotado" => StockStatus::OutOfStock,
            "comingsoon" | "preorder" | "presale" | "proximamente" => StockStatus::ComingSoon,
            _ => StockStatus::InStock,
        }
    }
}

impl Type<sqlx::Sqlite> for StockStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> Encode<'q, sqlx::Sqlite> for StockStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<sqlx::Sqlite>>::encode(self.as_str().to_string(), buf)
    }
}

impl<'r> Decode<'r, sqlx::Sqlite> for StockStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<sqlx::Sqlite>>::decode(value)?;
        match s.as_str() {
            "in_stock" => Ok(StockStatus::InStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            "coming_soon" => Ok(StockStatus::ComingSoon),
            _ => Err(format!("Invalid StockStatus: {s}").into()),
        }
    }
}

/// Lifecycle of one sync attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    InProgress,
    Success,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        }
    }
}

impl Type<sqlx::Sqlite> for SyncStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> Encode<'q, sqlx::Sqlite> for SyncStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<sqlx::Sqlite>>::encode(self.as_str().to_string(), buf)
    }
}

impl<'r> Decode<'r, sqlx::Sqlite> for SyncStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<sqlx::Sqlite>>::decode(value)?;
        match s.as_str() {
            "in_progress" => Ok(SyncStatus::InProgress),
            "success" => Ok(SyncStatus::Success),
            "error" => Ok(SyncStatus::Error),
            _ => Err(format!("Invalid SyncStatus: {s}").into()),
        }
    }
}

/// Lifecycle of a manual catalog upload; flips away from `Pending` exactly once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Approved,
    Rejected,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Approved => "approved",
            UploadStatus::Rejected => "rejected",
        }
    }
}

impl Type<sqlx::Sqlite> for UploadStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> Encode<'q, sqlx::Sqlite> for UploadStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<sqlx::Sqlite>>::encode(self.as_str().to_string(), buf)
    }
}

impl<'r> Decode<'r, sqlx::Sqlite> for UploadStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<sqlx::Sqlite>>::decode(value)?;
        match s.as_str() {
            "pending" => Ok(UploadStatus::Pending),
            "approved" => Ok(UploadStatus::Approved),
            "rejected" => Ok(UploadStatus::Rejected),
            _ => Err(format!("Invalid UploadStatus: {s}").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_label_vocabulary() {
        assert_eq!(StockStatus::from_label(None), StockStatus::InStock);
        assert_eq!(StockStatus::from_label(Some("In Stock")), StockStatus::InStock);
        assert_eq!(StockStatus::from_label(Some("available")), StockStatus::InStock);
        assert_eq!(StockStatus::from_label(Some("SOLD OUT")), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_label(Some("out-of-stock")), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_label(Some("Coming Soon")), StockStatus::ComingSoon);
        assert_eq!(StockStatus::from_label(Some("pre_order")), StockStatus::ComingSoon);
        // Unknown wording falls back to in stock rather than rejecting the row.
        assert_eq!(StockStatus::from_label(Some("5 left")), StockStatus::InStock);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [SyncStatus::InProgress, SyncStatus::Success, SyncStatus::Error] {
            assert!(!status.as_str().is_empty());
        }
        for status in [UploadStatus::Pending, UploadStatus::Approved, UploadStatus::Rejected] {
            assert!(!status.as_str().is_empty());
        }
    }
}
