//! Infrastructure layer: configuration, logging, storage and network plumbing.

pub mod config;
pub mod database_connection;
pub mod http_fetcher;
pub mod logging;
pub mod merchant_repository;
pub mod product_repository;
pub mod retry;
pub mod sync_log_repository;
pub mod taxonomy_cache;
pub mod upload_repository;

pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use http_fetcher::{CatalogSource, FetchError, HttpCatalogFetcher};
pub use merchant_repository::{MerchantRepository, NewMerchant};
pub use product_repository::{NewPrice, NewProduct, ProductRepository};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use sync_log_repository::SyncLogRepository;
pub use taxonomy_cache::{TaxonomyCache, TaxonomyDimension, TaxonomyError};
pub use upload_repository::UploadRepository;
