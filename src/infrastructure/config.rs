//! Configuration infrastructure
//!
//! Loads and persists the daemon's settings as a JSON file under the user's
//! configuration directory, creating sensible defaults on first run.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Built-in defaults, kept in one place so the config file and the code
/// never disagree about them.
mod defaults {
    pub const SYNC_CHECK_INTERVAL_SECONDS: u64 = 3600;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_INITIAL_DELAY_MS: u64 = 1000;
    pub const USER_AGENT: &str = "shopfeed/0.3 (catalog sync; +https://github.com/shopfeed/shopfeed)";
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database location. When no URL is configured the database lives under the
/// user's data directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// Settings for the retrying catalog fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub user_agent: String,

    /// Timeout per HTTP attempt, not per merchant sync, so one slow merchant
    /// cannot eat the whole retry budget.
    pub request_timeout_seconds: u64,

    /// Total attempts per fetch including the first one.
    pub max_retries: u32,

    /// Backoff before the second attempt; doubles each retry.
    pub retry_initial_delay_ms: u64,
}

/// Settings for the due-merchant scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the orchestrator checks which merchants are due.
    pub check_interval_seconds: u64,
}

/// Where manually submitted catalogs are staged while pending review.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    pub console_output: bool,

    pub file_output: bool,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            fetch: FetchConfig::default(),
            scheduler: SchedulerConfig::default(),
            uploads: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            retry_initial_delay_ms: defaults::RETRY_INITIAL_DELAY_MS,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: defaults::SYNC_CHECK_INTERVAL_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Resolves the database URL, defaulting to a file under the data directory.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.database.url {
            return Ok(url.clone());
        }
        let data_dir = ConfigManager::get_app_data_dir()?;
        Ok(format!("sqlite:{}", data_dir.join("shopfeed.db").display()))
    }

    /// Resolves the staging directory for manual catalog uploads.
    pub fn uploads_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.uploads.dir {
            return Ok(dir.clone());
        }
        Ok(ConfigManager::get_app_data_dir()?.join("uploads"))
    }
}

/// Configuration manager for loading and saving settings.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory.
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("shopfeed");
        Ok(config_dir)
    }

    /// Get the application data directory (database, upload staging).
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Failed to get user data directory")?
            .join("shopfeed");
        Ok(data_dir)
    }

    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self {
            config_path: config_dir.join("shopfeed_config.json"),
        })
    }

    /// Manager rooted at an explicit path, used by tests.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Initialize configuration system on first run.
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self
            .config_path
            .parent()
            .context("Failed to get config directory")?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("Failed to create config directory")?;
        }

        if self.config_path.exists() {
            return self.load_config().await;
        }

        info!("🎉 First run detected - writing default configuration");
        let default_config = AppConfig::default();
        self.save_config(&default_config).await?;
        Ok(default_config)
    }

    pub async fn load_config(&self) -> Result<AppConfig> {
        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read config file {:?}", self.config_path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", self.config_path))?;
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write config file {:?}", self.config_path))?;
        Ok(())
    }
}
