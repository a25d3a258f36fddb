//! Metrics for the session storage pipeline.
//!
//! [`StorageMetrics`] owns the Prometheus collectors. Pipeline code either
//! holds one (through the [`StorageMetricsRecorder`] trait) or uses the free
//! functions below, which record into a process-wide default set.

mod buckets;
mod error;
mod recorder;

use std::sync::OnceLock;

use prometheus::core::Collector;

pub use buckets::{BucketConfig, DEFAULT_DURATION_BUCKETS, DEFAULT_SIZE_BUCKETS};
pub use error::MetricsError;
pub use recorder::{FILE_TYPE_LABEL, NAMESPACE, StorageMetrics, StorageMetricsRecorder};

static GLOBAL: OnceLock<StorageMetrics> = OnceLock::new();

/// Returns the process-wide metric set, creating it with default buckets on first use.
pub fn global() -> &'static StorageMetrics {
    GLOBAL.get_or_init(StorageMetrics::new)
}

/// Installs `metrics` as the process-wide set.
///
/// Fails, handing the set back, when the global set was already created or installed.
pub fn install(metrics: StorageMetrics) -> Result<(), StorageMetrics> {
    GLOBAL.set(metrics)
}

/// Every collector of the process-wide set, in a stable order.
pub fn collectors() -> Vec<Box<dyn Collector>> {
    global().collectors()
}

/// Records a session file size in bytes into the [`global`] set.
pub fn record_session_size(file_size: f64, file_type: &str) {
    global().record_session_size(file_size, file_type);
}

/// Counts one processed session in the [`global`] set.
pub fn increase_total_sessions() {
    global().increase_total_sessions();
}

/// Records a skipped session file size in bytes into the [`global`] set.
pub fn record_skipped_session_size(file_size: f64, file_type: &str) {
    global().record_skipped_session_size(file_size, file_type);
}

/// Counts one skipped session in the [`global`] set.
pub fn increase_total_skipped_sessions() {
    global().increase_total_skipped_sessions();
}

/// Records a read duration, given in milliseconds, into the [`global`] set.
pub fn record_read_duration(dur_millis: f64, file_type: &str) {
    global().record_read_duration(dur_millis, file_type);
}

/// Records a sort duration, given in milliseconds, into the [`global`] set.
pub fn record_sort_duration(dur_millis: f64, file_type: &str) {
    global().record_sort_duration(dur_millis, file_type);
}

/// Records an encode duration, given in milliseconds, into the [`global`] set.
pub fn record_encode_duration(dur_millis: f64, file_type: &str) {
    global().record_encode_duration(dur_millis, file_type);
}

/// Records a compress duration, given in milliseconds, into the [`global`] set.
pub fn record_compress_duration(dur_millis: f64, file_type: &str) {
    global().record_compress_duration(dur_millis, file_type);
}

/// Records an upload duration, given in milliseconds, into the [`global`] set.
pub fn record_upload_duration(dur_millis: f64, file_type: &str) {
    global().record_upload_duration(dur_millis, file_type);
}
