//! shopfeed daemon entry point
//!
//! Loads (or creates) the configuration, initializes logging and storage,
//! then runs the scheduled due-merchant scan until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use shopfeed::application::SyncOrchestrator;
use shopfeed::infrastructure::config::ConfigManager;
use shopfeed::infrastructure::database_connection::DatabaseConnection;
use shopfeed::infrastructure::http_fetcher::HttpCatalogFetcher;
use shopfeed::infrastructure::logging::init_logging;
use shopfeed::infrastructure::product_repository::ProductRepository;
use shopfeed::infrastructure::taxonomy_cache::TaxonomyCache;

#[tokio::main]
async fn main() -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let config = config_manager.initialize_on_first_run().await?;
    init_logging(&config.logging)?;

    info!("🚀 shopfeed starting");

    let db = DatabaseConnection::new(&config.database_url()?).await?;
    db.migrate().await?;
    let pool = db.pool().clone();

    let taxonomy = Arc::new(TaxonomyCache::new(pool.clone()));
    taxonomy.warm().await?;

    let fetcher = Arc::new(HttpCatalogFetcher::new(&config.fetch)?);
    let orchestrator = SyncOrchestrator::new(pool.clone(), fetcher, taxonomy);

    let stats = ProductRepository::new(pool).statistics().await?;
    info!(
        "catalog holds {} merchants, {} products, {} price rows",
        stats.total_merchants, stats.total_products, stats.total_prices
    );

    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.scheduler.check_interval_seconds.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match orchestrator.run_due_syncs().await {
                    Ok(summary) => info!(
                        "sync scan finished: {} checked, {} synced, {} failed",
                        summary.merchants_checked, summary.synced, summary.failed
                    ),
                    Err(e) => error!("sync scan aborted: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping");
                break;
            }
        }
    }

    Ok(())
}
