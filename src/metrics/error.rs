use thiserror::Error;

/// Errors raised while building, registering or rendering storage metrics.
///
/// Recording an observation never fails; these only surface at setup and scrape time.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid {schema} buckets: {reason}")]
    InvalidBuckets { schema: &'static str, reason: String },

    #[error("prometheus client error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
