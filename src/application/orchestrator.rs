//! Sync orchestrator
//!
//! Decides which merchants are due, runs the fetch → validate → reconcile
//! pipeline per merchant, and guarantees every attempt lands in the sync
//! ledger regardless of outcome. One merchant's failure never aborts the
//! scan of its siblings.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::application::reconciler::{
    ImportMode, MerchantContext, ProductReconciler, ReconcileOutcome,
};
use crate::application::validator::validate_catalog;
use crate::application::SyncError;
use crate::domain::catalog::Catalog;
use crate::domain::entities::Merchant;
use crate::infrastructure::http_fetcher::CatalogSource;
use crate::infrastructure::merchant_repository::MerchantRepository;
use crate::infrastructure::sync_log_repository::SyncLogRepository;
use crate::infrastructure::taxonomy_cache::TaxonomyCache;

/// Result of one successful merchant sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncOutcome {
    pub log_id: i64,
    pub imported: u32,
}

/// Tally of one due-merchant scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct DueScanSummary {
    pub merchants_checked: usize,
    pub synced: usize,
    pub failed: usize,
}

pub struct SyncOrchestrator {
    merchants: MerchantRepository,
    sync_logs: SyncLogRepository,
    reconciler: ProductReconciler,
    source: Arc<dyn CatalogSource>,
}

impl SyncOrchestrator {
    pub fn new(
        pool: SqlitePool,
        source: Arc<dyn CatalogSource>,
        taxonomy: Arc<TaxonomyCache>,
    ) -> Self {
        Self {
            merchants: MerchantRepository::new(pool.clone()),
            sync_logs: SyncLogRepository::new(pool.clone()),
            reconciler: ProductReconciler::new(pool, taxonomy),
            source,
        }
    }

    /// Syncs one merchant now, refreshing products in place.
    pub async fn sync_merchant(&self, merchant_id: i64) -> Result<SyncOutcome, SyncError> {
        self.run_sync(merchant_id, ImportMode::Refresh).await
    }

    /// Admin-triggered resync that discards the merchant's existing products
    /// and prices before reimporting.
    pub async fn full_resync_merchant(&self, merchant_id: i64) -> Result<SyncOutcome, SyncError> {
        self.run_sync(merchant_id, ImportMode::FullResync).await
    }

    /// Scans active merchants and syncs every one whose cadence has elapsed
    /// (or who has never synced). Merchants are processed sequentially; a
    /// failure is recorded and the scan moves on.
    pub async fn run_due_syncs(&self) -> Result<DueScanSummary, SyncError> {
        let now = Utc::now();
        let merchants = self.merchants.find_active().await?;

        let mut summary = DueScanSummary {
            merchants_checked: merchants.len(),
            ..DueScanSummary::default()
        };

        for merchant in &merchants {
            if merchant.catalog_url.is_none() || !Self::is_due(merchant, now) {
                continue;
            }
            match self.sync_merchant(merchant.id).await {
                Ok(outcome) => {
                    summary.synced += 1;
                    info!(
                        "✅ synced merchant '{}' ({} products)",
                        merchant.name, outcome.imported
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!("❌ sync failed for merchant '{}': {}", merchant.name, err);
                }
            }
        }

        Ok(summary)
    }

    /// A merchant is due when it has never synced or its configured interval
    /// has fully elapsed since the last success.
    pub fn is_due(merchant: &Merchant, now: DateTime<Utc>) -> bool {
        match merchant.last_synced_at {
            None => true,
            Some(last) => now - last >= Duration::minutes(merchant.sync_interval_minutes),
        }
    }

    async fn run_sync(&self, merchant_id: i64, mode: ImportMode) -> Result<SyncOutcome, SyncError> {
        let merchant = self
            .merchants
            .find_by_id(merchant_id)
            .await?
            .ok_or(SyncError::MerchantNotFound(merchant_id))?;
        let catalog_url = merchant
            .catalog_url
            .clone()
            .ok_or(SyncError::MissingCatalogUrl(merchant_id))?;

        // The attempt is on the ledger before the first byte is fetched.
        let started_at = Utc::now();
        let log_id = self.sync_logs.start_attempt(merchant_id, started_at).await?;
        info!("🔄 sync attempt {} started for merchant '{}'", log_id, merchant.name);

        match self.attempt(&merchant, &catalog_url, mode).await {
            Ok(outcome) => {
                let completed_at = Utc::now();
                self.sync_logs
                    .complete_success(log_id, i64::from(outcome.products_processed), completed_at)
                    .await?;
                self.merchants
                    .touch_last_synced(merchant_id, completed_at)
                    .await?;
                Ok(SyncOutcome {
                    log_id,
                    imported: outcome.products_processed,
                })
            }
            Err(err) => {
                // The merchant's last-sync timestamp stays untouched so it
                // remains eligible on the next scheduled check.
                let message = err.user_message();
                if let Err(log_err) = self
                    .sync_logs
                    .complete_error(log_id, &message, Utc::now())
                    .await
                {
                    error!("failed to record sync error for attempt {}: {}", log_id, log_err);
                }
                Err(err)
            }
        }
    }

    async fn attempt(
        &self,
        merchant: &Merchant,
        catalog_url: &str,
        mode: ImportMode,
    ) -> Result<ReconcileOutcome, SyncError> {
        let payload = self.source.fetch_catalog(catalog_url).await?;

        let report = validate_catalog(&payload);
        if !report.valid {
            return Err(SyncError::ValidationFailed(report));
        }

        let catalog = Catalog::from_value(&payload)?;
        self.reconciler
            .reconcile(
                &catalog,
                &MerchantContext {
                    merchant_id: merchant.id,
                    mode,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merchant(now: DateTime<Utc>, last_synced_minutes_ago: Option<i64>, interval_minutes: i64) -> Merchant {
        Merchant {
            id: 1,
            name: "Nord Outfitters".to_string(),
            website_url: "https://nord.example.com".to_string(),
            catalog_url: Some("https://nord.example.com/catalog.json".to_string()),
            sync_interval_minutes: interval_minutes,
            last_synced_at: last_synced_minutes_ago.map(|m| now - Duration::minutes(m)),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn never_synced_merchants_are_due() {
        let now = Utc::now();
        assert!(SyncOrchestrator::is_due(&merchant(now, None, 60), now));
    }

    #[test]
    fn due_when_interval_has_elapsed() {
        let now = Utc::now();
        assert!(SyncOrchestrator::is_due(&merchant(now, Some(61), 60), now));
        assert!(SyncOrchestrator::is_due(&merchant(now, Some(60), 60), now));
        assert!(!SyncOrchestrator::is_due(&merchant(now, Some(59), 60), now));
        assert!(!SyncOrchestrator::is_due(&merchant(now, Some(10), 1440), now));
    }
}
