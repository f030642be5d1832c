use thiserror::Error;

/// Errors raised by the notification transports.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Required transport setting is absent
    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status
    #[error("{transport} returned {status}: {body}")]
    Rejected {
        transport: &'static str,
        status: u16,
        body: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
