//! Application layer: validation, reconciliation, orchestration, review gate.

pub mod orchestrator;
pub mod reconciler;
pub mod review;
pub mod validator;

pub use orchestrator::{DueScanSummary, SyncOrchestrator, SyncOutcome};
pub use reconciler::{ImportMode, MerchantContext, ProductReconciler, ReconcileOutcome};
pub use review::CatalogUploadService;
pub use validator::{ValidationReport, validate_catalog};

use crate::domain::entities::UploadStatus;
use crate::infrastructure::http_fetcher::FetchError;
use crate::infrastructure::taxonomy_cache::TaxonomyError;

/// Terminal failure of one sync attempt or review action.
///
/// The fetcher retries transient network failures internally; everything
/// surfacing here is final for the attempt. The orchestrator records each
/// variant in the sync ledger with a cause-specific message and moves on to
/// the next merchant.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Structural catalog defects. Never retried; the input must be fixed.
    #[error("catalog validation failed: {0}")]
    ValidationFailed(ValidationReport),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Taxonomy insert-if-absent resolved inconsistently. Retryable.
    #[error("taxonomy mapping conflict: {0}")]
    MappingConflict(String),

    /// Any write-phase failure; the surrounding transaction was rolled back.
    #[error("storage transaction failed: {0}")]
    TransactionAborted(#[from] sqlx::Error),

    #[error("merchant {0} not found")]
    MerchantNotFound(i64),

    #[error("merchant {0} has no catalog URL configured")]
    MissingCatalogUrl(i64),

    #[error("catalog upload {0} not found")]
    UploadNotFound(i64),

    #[error("catalog upload {id} was already reviewed ({status})")]
    UploadAlreadyReviewed { id: i64, status: String },

    /// A payload passed validation but could not be decoded into the typed
    /// catalog model.
    #[error("catalog payload could not be decoded: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("upload storage failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TaxonomyError> for SyncError {
    fn from(error: TaxonomyError) -> Self {
        match error {
            TaxonomyError::MappingConflict { dimension, label } => {
                SyncError::MappingConflict(format!("{dimension} label '{label}'"))
            }
            TaxonomyError::Storage(e) => SyncError::TransactionAborted(e),
        }
    }
}

impl SyncError {
    /// Human-readable cause for the sync ledger. Distinguishes no-response,
    /// non-2xx, slow-response and unreadable-response failures because admins
    /// triage them differently.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Fetch(FetchError::Unreachable { reason }) => {
                format!("merchant endpoint could not be reached: {reason}")
            }
            SyncError::Fetch(FetchError::Timeout { timeout_secs, url }) => {
                format!("merchant did not respond within {timeout_secs}s ({url})")
            }
            SyncError::Fetch(FetchError::HttpStatus { status, url }) => {
                format!("merchant endpoint answered HTTP {status} ({url})")
            }
            SyncError::Fetch(FetchError::Malformed { url, reason }) => {
                format!("merchant returned an unreadable catalog ({url}): {reason}")
            }
            SyncError::ValidationFailed(report) => {
                format!("catalog failed validation: {report}")
            }
            SyncError::TransactionAborted(e) => {
                format!("catalog import was rolled back: {e}")
            }
            other => other.to_string(),
        }
    }

    fn upload_already_reviewed(id: i64, status: UploadStatus) -> Self {
        SyncError::UploadAlreadyReviewed {
            id,
            status: status.as_str().to_string(),
        }
    }
}
