// crates/fishsoop-core/src/error.rs

use fishsoop_bucket::{BucketError, ObjectLocation};
use fishsoop_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid storage event: {0}")]
    InvalidEvent(String),

    #[error("Object storage error: {0}")]
    Bucket(#[from] BucketError),

    #[error("Sensor file parsing failed: {0}")]
    Parser(#[from] ParserError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Data processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Failures of the send/ledger workflow.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Creation was requested but the ledger already holds send history.
    #[error("ledger {0} already exists; refusing to overwrite send history")]
    LedgerCreateConflict(ObjectLocation),

    #[error("could not read ledger {location}: {message}")]
    LedgerRead {
        location: ObjectLocation,
        message: String,
    },

    #[error("could not write ledger {location}: {message}")]
    LedgerWrite {
        location: ObjectLocation,
        message: String,
    },

    #[error("mail transport failed: {0}")]
    SendTransport(String),

    #[error("message context incomplete: {0}")]
    TemplateContext(String),

    #[error("attachment {name} unavailable: {message}")]
    ArtifactUnavailable { name: String, message: String },
}

impl NotifyError {
    /// Stable identifier used in job reports.
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyError::LedgerCreateConflict(_) => "ledger_create_conflict",
            NotifyError::LedgerRead { .. } => "ledger_read_failure",
            NotifyError::LedgerWrite { .. } => "ledger_write_failure",
            NotifyError::SendTransport(_) => "send_transport_failure",
            NotifyError::TemplateContext(_) => "template_context_error",
            NotifyError::ArtifactUnavailable { .. } => "artifact_unavailable",
        }
    }
}
