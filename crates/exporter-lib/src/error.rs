//! Error taxonomy for the exporter core
//!
//! Every variant is recovered at the collector boundary: the failing
//! collector logs it and emits nothing for that scrape cycle.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExporterError>;

#[derive(Debug, Error)]
pub enum ExporterError {
    /// The management API answered with a non-2xx status
    #[error("request to {path} failed with status {status}: {body}")]
    Fetch {
        path: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connect failure, timeout)
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The payload matched none of the accepted wire shapes
    #[error("failed to decode response: {context}")]
    Decode { context: String },

    /// An envelope carried a non-OK status code
    #[error("API error {status}: {message}")]
    Api { status: i64, message: String },

    /// A single-result fetch returned zero records
    #[error("no results found at {path}")]
    NotFound { path: String },

    #[error("invalid certificate: {0}")]
    Certificate(String),

    /// Included child ids plus subtotal entries must be even and non-zero
    #[error("autoscale parity check failed: {included} included child ids, {subtotals} subtotals")]
    Parity { included: usize, subtotals: usize },

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ExporterError {
    /// Short machine-friendly kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            ExporterError::Fetch { .. } => "fetch",
            ExporterError::Transport { .. } => "transport",
            ExporterError::Decode { .. } => "decode",
            ExporterError::Api { .. } => "api",
            ExporterError::NotFound { .. } => "not_found",
            ExporterError::Certificate(_) => "certificate",
            ExporterError::Parity { .. } => "parity",
            ExporterError::Metrics(_) => "metrics",
            ExporterError::InvalidUrl(_) => "invalid_url",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_carries_status_and_body() {
        let err = ExporterError::Fetch {
            path: "/admin/projects".to_string(),
            status: 503,
            body: "maintenance".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("maintenance"));
        assert_eq!(err.kind(), "fetch");
    }

    #[test]
    fn test_parity_error_message() {
        let err = ExporterError::Parity {
            included: 1,
            subtotals: 2,
        };
        assert_eq!(
            err.to_string(),
            "autoscale parity check failed: 1 included child ids, 2 subtotals"
        );
    }
}
