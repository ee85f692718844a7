// Error taxonomy for the ingestion pipeline and dashboard service
use thiserror::Error;

/// One failed transport attempt, kept for the aggregated error
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    pub strategy: String,
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Every configured transport strategy failed for one fetch.
    #[error("all transports failed ({})", format_attempts(.attempts))]
    AllTransportsFailed { attempts: Vec<AttemptFailure> },

    /// The source was read but produced zero records.
    #[error("data is empty")]
    EmptyDataset,

    #[error("invalid source url {url}: {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("invalid time window: months must be between 1 and 12")]
    InvalidTimeWindow,

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("preference store error: {0}")]
    Store(String),

    #[error("failed to export csv: {0}")]
    Export(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
