use sea_orm::DbErr;
use thiserror::Error;

/// Carrier status lookups are network-bound in a real integration; both
/// variants are per-tracking recoverable conditions for the monitor.
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("Carrier timeout after {0:?} for {1}")]
    Timeout(std::time::Duration, String),
    #[error("Carrier unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("Notifier timeout after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
}

/// Fatal conditions for a monitor pass. Per-record failures (carrier lookup,
/// missing user, notifier transport) are logged and counted in the pass
/// summary instead; only the initial bulk reads abort the whole pass.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to load active trackings: {0}")]
    FetchTrackings(#[source] DbErr),
    #[error("Failed to load exception rules: {0}")]
    FetchRules(#[source] DbErr),
    #[error("Failed to load pending notifications: {0}")]
    FetchPending(#[source] DbErr),
}

impl MonitorError {
    /// All fatal fetch errors are worth retrying at the scheduler level.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::FetchTrackings(_)
                | MonitorError::FetchRules(_)
                | MonitorError::FetchPending(_)
        )
    }
}
