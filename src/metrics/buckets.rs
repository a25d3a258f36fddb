//! Bucket schemas shared by the storage histograms.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::MetricsError;

/// Upper bounds, in seconds, for every `*_duration_seconds` histogram.
pub const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    180.0, 240.0, 300.0,
];

/// Upper bounds, in bytes, for the session size histograms.
pub const DEFAULT_SIZE_BUCKETS: &[f64] = &[
    1.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 25_000.0,
    50_000.0, 100_000.0, 250_000.0, 500_000.0, 1_000_000.0,
];

fn default_duration_buckets() -> Vec<f64> {
    DEFAULT_DURATION_BUCKETS.to_vec()
}

fn default_size_buckets() -> Vec<f64> {
    DEFAULT_SIZE_BUCKETS.to_vec()
}

/// The two bucket schemas used when building a [`StorageMetrics`](super::StorageMetrics) set.
///
/// Either field may be omitted in the configuration and falls back to its default.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct BucketConfig {
    #[serde(default = "default_duration_buckets")]
    pub duration: Vec<f64>,
    #[serde(default = "default_size_buckets")]
    pub size: Vec<f64>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        BucketConfig {
            duration: default_duration_buckets(),
            size: default_size_buckets(),
        }
    }
}

impl BucketConfig {
    /// Checks that both schemas are non-empty, finite and strictly increasing.
    pub fn validate(&self) -> Result<(), MetricsError> {
        check_schema("duration", &self.duration)?;
        check_schema("size", &self.size)
    }
}

fn check_schema(schema: &'static str, bounds: &[f64]) -> Result<(), MetricsError> {
    let invalid = |reason: String| MetricsError::InvalidBuckets { schema, reason };

    if bounds.is_empty() {
        return Err(invalid("at least one bound is required".to_string()));
    }
    if let Some(bound) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(invalid(format!("bound {} is not finite", bound)));
    }
    if let Some(pair) = bounds.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(invalid(format!(
            "bounds must be strictly increasing, got {} before {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}
