//! Admin review gate for manually uploaded catalogs
//!
//! Uploads are validated on submission, staged to disk, and held `pending`
//! until an admin decides. Approval routes the stored catalog into the same
//! reconciler the scheduled sync uses, wrapping merchant upsert, product
//! import and the status flip in one transaction; rejection records the
//! decision and nothing else.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::application::reconciler::{ProductReconciler, ReconcileOutcome};
use crate::application::validator::validate_catalog;
use crate::application::SyncError;
use crate::domain::catalog::Catalog;
use crate::domain::entities::{CatalogUpload, UploadStatus};
use crate::infrastructure::merchant_repository::MerchantRepository;
use crate::infrastructure::taxonomy_cache::TaxonomyCache;
use crate::infrastructure::upload_repository::UploadRepository;

pub struct CatalogUploadService {
    pool: SqlitePool,
    uploads: UploadRepository,
    reconciler: ProductReconciler,
    uploads_dir: PathBuf,
}

impl CatalogUploadService {
    pub fn new(pool: SqlitePool, taxonomy: Arc<TaxonomyCache>, uploads_dir: PathBuf) -> Self {
        Self {
            uploads: UploadRepository::new(pool.clone()),
            reconciler: ProductReconciler::new(pool.clone(), taxonomy),
            pool,
            uploads_dir,
        }
    }

    /// Validates a submitted catalog and stages it for review. An invalid
    /// payload is returned with the complete violation list and nothing is
    /// stored.
    pub async fn submit(&self, payload: &Value) -> Result<CatalogUpload, SyncError> {
        let report = validate_catalog(payload);
        if !report.valid {
            return Err(SyncError::ValidationFailed(report));
        }

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let file_path = self.uploads_dir.join(format!("{}.json", Uuid::new_v4()));
        tokio::fs::write(&file_path, serde_json::to_vec_pretty(payload)?).await?;

        let upload = self
            .uploads
            .create(&file_path.to_string_lossy(), Utc::now())
            .await?;
        info!("📥 catalog upload {} staged at {}", upload.id, upload.file_path);
        Ok(upload)
    }

    /// Approves a pending upload: matches the merchant by the catalog's
    /// store info, imports the products, and flips the upload to `approved` -
    /// all in one transaction, so the catalog is handed to the reconciler
    /// exactly once.
    pub async fn approve(
        &self,
        upload_id: i64,
        notes: Option<&str>,
    ) -> Result<ReconcileOutcome, SyncError> {
        let upload = self.pending_upload(upload_id).await?;

        let raw = tokio::fs::read_to_string(&upload.file_path).await?;
        let payload: Value = serde_json::from_str(&raw)?;

        // Re-validated at decision time; the staged file is the source of truth.
        let report = validate_catalog(&payload);
        if !report.valid {
            return Err(SyncError::ValidationFailed(report));
        }
        let catalog = Catalog::from_value(&payload)?;

        let mapped = self.reconciler.map_items(&catalog.products).await?;

        let mut tx = self.pool.begin().await?;
        let merchant_id =
            MerchantRepository::upsert_from_store_info(&mut tx, &catalog.store_info).await?;
        let outcome = ProductReconciler::import_items(&mut tx, merchant_id, &mapped).await?;
        let decided =
            UploadRepository::decide(&mut tx, upload_id, UploadStatus::Approved, notes, Utc::now())
                .await?;
        if !decided {
            // Lost a race with another decision; the open transaction rolls
            // back on drop and the import never lands.
            drop(tx);
            return Err(self.already_reviewed(upload_id).await);
        }
        tx.commit().await?;

        info!(
            "✅ upload {} approved: {} products imported for merchant {}",
            upload_id, outcome.products_processed, merchant_id
        );
        Ok(outcome)
    }

    /// Rejects a pending upload with notes. No data-model side effects beyond
    /// the terminal status.
    pub async fn reject(&self, upload_id: i64, notes: Option<&str>) -> Result<(), SyncError> {
        self.pending_upload(upload_id).await?;

        let mut conn = self.pool.acquire().await?;
        let decided =
            UploadRepository::decide(&mut conn, upload_id, UploadStatus::Rejected, notes, Utc::now())
                .await?;
        if !decided {
            return Err(self.already_reviewed(upload_id).await);
        }
        info!("🚫 upload {} rejected", upload_id);
        Ok(())
    }

    pub async fn list_pending(&self) -> Result<Vec<CatalogUpload>, SyncError> {
        Ok(self.uploads.list_pending().await?)
    }

    /// Builds the already-reviewed error from the status that actually won.
    async fn already_reviewed(&self, upload_id: i64) -> SyncError {
        match self.uploads.find_by_id(upload_id).await {
            Ok(Some(upload)) => SyncError::upload_already_reviewed(upload_id, upload.status),
            Ok(None) => SyncError::UploadNotFound(upload_id),
            Err(e) => SyncError::TransactionAborted(e),
        }
    }

    async fn pending_upload(&self, upload_id: i64) -> Result<CatalogUpload, SyncError> {
        let upload = self
            .uploads
            .find_by_id(upload_id)
            .await?
            .ok_or(SyncError::UploadNotFound(upload_id))?;
        if upload.status != UploadStatus::Pending {
            return Err(SyncError::upload_already_reviewed(upload_id, upload.status));
        }
        Ok(upload)
    }
}
