//! Storage pipeline metrics backed by Prometheus.

use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
    register_histogram_vec_with_registry, register_int_counter_with_registry,
};
use std::sync::Arc;
use tracing::debug;

use super::buckets::BucketConfig;
use super::error::MetricsError;

/// Namespace prefixed to every storage metric name.
pub const NAMESPACE: &str = "storage";

/// The single label carried by every storage histogram.
pub const FILE_TYPE_LABEL: &str = "file_type";

/// Trait for recording storage pipeline observations.
///
/// Durations are passed in milliseconds and recorded in seconds; sizes are
/// recorded unchanged in bytes.
pub trait StorageMetricsRecorder: Clone + Send + Sync + 'static {
    /// Records the size of a session file before any manipulation.
    fn record_session_size(&self, file_size: f64, file_type: &str);

    /// Counts one processed session.
    fn increase_total_sessions(&self);

    /// Records the size of a session file skipped because of the size limits.
    fn record_skipped_session_size(&self, file_size: f64, file_type: &str);

    /// Counts one session skipped because of the size limits.
    fn increase_total_skipped_sessions(&self);

    /// Records how long reading a session took.
    fn record_read_duration(&self, dur_millis: f64, file_type: &str);

    /// Records how long sorting a session took.
    fn record_sort_duration(&self, dur_millis: f64, file_type: &str);

    /// Records how long encoding a session took.
    fn record_encode_duration(&self, dur_millis: f64, file_type: &str);

    /// Records how long compressing a session took.
    fn record_compress_duration(&self, dur_millis: f64, file_type: &str);

    /// Records how long uploading a session to s3 took.
    fn record_upload_duration(&self, dur_millis: f64, file_type: &str);
}

/// Prometheus collectors for the session storage pipeline.
///
/// Clones share the same underlying metrics and registry.
#[derive(Clone)]
pub struct StorageMetrics {
    registry: Arc<Registry>,

    // Session size metrics
    session_size_bytes: HistogramVec,
    sessions_total: IntCounter,
    skipped_session_size_bytes: HistogramVec,
    sessions_skipped_total: IntCounter,

    // Pipeline stage durations
    read_duration_seconds: HistogramVec,
    sort_duration_seconds: HistogramVec,
    encode_duration_seconds: HistogramVec,
    compress_duration_seconds: HistogramVec,
    upload_duration_seconds: HistogramVec,
}

impl StorageMetrics {
    /// Creates the metric set with the default bucket schemas on a fresh registry.
    pub fn new() -> Self {
        Self::with_buckets(&BucketConfig::default())
            .expect("Failed to register storage metrics with default buckets")
    }

    /// Creates the metric set with custom bucket schemas on a fresh registry.
    pub fn with_buckets(buckets: &BucketConfig) -> Result<Self, MetricsError> {
        buckets.validate()?;

        let registry = Arc::new(Registry::new());

        // Session size metrics
        let session_size_bytes = register_histogram(
            &registry,
            "session_size_bytes",
            "A histogram displaying the size of each session file in bytes prior to any manipulation.",
            &buckets.size,
        )?;

        let sessions_total = register_int_counter_with_registry!(
            Opts::new(
                "sessions_total",
                "A counter displaying the total number of all processed sessions."
            )
            .namespace(NAMESPACE),
            registry.clone()
        )?;

        let skipped_session_size_bytes = register_histogram(
            &registry,
            "skipped_session_size_bytes",
            "A histogram displaying the size of each skipped session file in bytes.",
            &buckets.size,
        )?;

        let sessions_skipped_total = register_int_counter_with_registry!(
            Opts::new(
                "sessions_skipped_total",
                "A counter displaying the total number of all skipped sessions because of the size limits."
            )
            .namespace(NAMESPACE),
            registry.clone()
        )?;

        // Pipeline stage durations
        let read_duration_seconds = register_histogram(
            &registry,
            "read_duration_seconds",
            "A histogram displaying the duration of reading for each session in seconds.",
            &buckets.duration,
        )?;

        let sort_duration_seconds = register_histogram(
            &registry,
            "sort_duration_seconds",
            "A histogram displaying the duration of sorting for each session in seconds.",
            &buckets.duration,
        )?;

        let encode_duration_seconds = register_histogram(
            &registry,
            "encode_duration_seconds",
            "A histogram displaying the duration of encoding for each session in seconds.",
            &buckets.duration,
        )?;

        let compress_duration_seconds = register_histogram(
            &registry,
            "compress_duration_seconds",
            "A histogram displaying the duration of compressing for each session in seconds.",
            &buckets.duration,
        )?;

        let upload_duration_seconds = register_histogram(
            &registry,
            "upload_duration_seconds",
            "A histogram displaying the duration of uploading to s3 for each session in seconds.",
            &buckets.duration,
        )?;

        debug!(
            duration_buckets = buckets.duration.len(),
            size_buckets = buckets.size.len(),
            "Registered storage metrics"
        );

        Ok(StorageMetrics {
            registry,
            session_size_bytes,
            sessions_total,
            skipped_session_size_bytes,
            sessions_skipped_total,
            read_duration_seconds,
            sort_duration_seconds,
            encode_duration_seconds,
            compress_duration_seconds,
            upload_duration_seconds,
        })
    }

    /// Returns every storage collector, always in the same order.
    ///
    /// The collectors share state with `self`, so registering them elsewhere
    /// exposes the same observations.
    pub fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![
            Box::new(self.session_size_bytes.clone()),
            Box::new(self.sessions_total.clone()),
            Box::new(self.skipped_session_size_bytes.clone()),
            Box::new(self.sessions_skipped_total.clone()),
            Box::new(self.read_duration_seconds.clone()),
            Box::new(self.sort_duration_seconds.clone()),
            Box::new(self.encode_duration_seconds.clone()),
            Box::new(self.compress_duration_seconds.clone()),
            Box::new(self.upload_duration_seconds.clone()),
        ]
    }

    /// Registers all storage collectors on a registry owned by the caller.
    pub fn register_into(&self, registry: &Registry) -> Result<(), MetricsError> {
        for collector in self.collectors() {
            registry.register(collector)?;
        }
        Ok(())
    }

    /// The registry the metric set was created on.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for StorageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StorageMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageMetrics")
            .field("namespace", &NAMESPACE)
            .field("sessions_total", &self.sessions_total.get())
            .field("sessions_skipped_total", &self.sessions_skipped_total.get())
            .finish()
    }
}

impl StorageMetricsRecorder for StorageMetrics {
    fn record_session_size(&self, file_size: f64, file_type: &str) {
        self.session_size_bytes
            .with_label_values(&[file_type])
            .observe(file_size);
    }

    fn increase_total_sessions(&self) {
        self.sessions_total.inc();
    }

    fn record_skipped_session_size(&self, file_size: f64, file_type: &str) {
        self.skipped_session_size_bytes
            .with_label_values(&[file_type])
            .observe(file_size);
    }

    fn increase_total_skipped_sessions(&self) {
        self.sessions_skipped_total.inc();
    }

    fn record_read_duration(&self, dur_millis: f64, file_type: &str) {
        self.read_duration_seconds
            .with_label_values(&[file_type])
            .observe(millis_to_seconds(dur_millis));
    }

    fn record_sort_duration(&self, dur_millis: f64, file_type: &str) {
        self.sort_duration_seconds
            .with_label_values(&[file_type])
            .observe(millis_to_seconds(dur_millis));
    }

    fn record_encode_duration(&self, dur_millis: f64, file_type: &str) {
        self.encode_duration_seconds
            .with_label_values(&[file_type])
            .observe(millis_to_seconds(dur_millis));
    }

    fn record_compress_duration(&self, dur_millis: f64, file_type: &str) {
        self.compress_duration_seconds
            .with_label_values(&[file_type])
            .observe(millis_to_seconds(dur_millis));
    }

    fn record_upload_duration(&self, dur_millis: f64, file_type: &str) {
        self.upload_duration_seconds
            .with_label_values(&[file_type])
            .observe(millis_to_seconds(dur_millis));
    }
}

fn millis_to_seconds(dur_millis: f64) -> f64 {
    dur_millis / 1000.0
}

fn register_histogram(
    registry: &Arc<Registry>,
    name: &str,
    help: &str,
    buckets: &[f64],
) -> Result<HistogramVec, prometheus::Error> {
    register_histogram_vec_with_registry!(
        HistogramOpts::new(name, help)
            .namespace(NAMESPACE)
            .buckets(buckets.to_vec()),
        &[FILE_TYPE_LABEL],
        registry.clone()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: [&str; 9] = [
        "storage_session_size_bytes",
        "storage_sessions_total",
        "storage_skipped_session_size_bytes",
        "storage_sessions_skipped_total",
        "storage_read_duration_seconds",
        "storage_sort_duration_seconds",
        "storage_encode_duration_seconds",
        "storage_compress_duration_seconds",
        "storage_upload_duration_seconds",
    ];

    fn collector_names(metrics: &StorageMetrics) -> Vec<String> {
        metrics
            .collectors()
            .iter()
            .flat_map(|c| c.desc().into_iter().map(|d| d.fq_name.clone()))
            .collect()
    }

    fn render_registry(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .expect("Failed to encode metrics");
        String::from_utf8(buffer).expect("Invalid UTF-8")
    }

    #[test]
    fn session_size_is_recorded_in_bytes() {
        let metrics = StorageMetrics::new();
        metrics.record_session_size(2048.0, "dom");

        let histogram = metrics.session_size_bytes.with_label_values(&["dom"]);
        assert_eq!(histogram.get_sample_count(), 1);
        assert_eq!(histogram.get_sample_sum(), 2048.0);
    }

    #[test]
    fn skipped_session_size_is_kept_apart_from_processed_sizes() {
        let metrics = StorageMetrics::new();
        metrics.record_skipped_session_size(50_000_000.0, "devtools");

        let skipped = metrics
            .skipped_session_size_bytes
            .with_label_values(&["devtools"]);
        assert_eq!(skipped.get_sample_sum(), 50_000_000.0);

        let processed = metrics.session_size_bytes.with_label_values(&["devtools"]);
        assert_eq!(processed.get_sample_count(), 0);
    }

    #[test]
    fn durations_are_converted_from_millis_to_seconds() {
        let metrics = StorageMetrics::new();
        let cases: [(fn(&StorageMetrics, f64, &str), &HistogramVec); 5] = [
            (
                StorageMetrics::record_read_duration,
                &metrics.read_duration_seconds,
            ),
            (
                StorageMetrics::record_sort_duration,
                &metrics.sort_duration_seconds,
            ),
            (
                StorageMetrics::record_encode_duration,
                &metrics.encode_duration_seconds,
            ),
            (
                StorageMetrics::record_compress_duration,
                &metrics.compress_duration_seconds,
            ),
            (
                StorageMetrics::record_upload_duration,
                &metrics.upload_duration_seconds,
            ),
        ];

        for (record, histogram) in cases {
            record(&metrics, 1500.0, "dom");
            let observed = histogram.with_label_values(&["dom"]);
            assert_eq!(observed.get_sample_count(), 1);
            assert_eq!(observed.get_sample_sum(), 1.5);
        }
    }

    #[test]
    fn file_type_label_separates_observations() {
        let metrics = StorageMetrics::new();
        metrics.record_read_duration(100.0, "dom");
        metrics.record_read_duration(200.0, "dom");
        metrics.record_read_duration(300.0, "devtools");

        let dom = metrics.read_duration_seconds.with_label_values(&["dom"]);
        let devtools = metrics.read_duration_seconds.with_label_values(&["devtools"]);
        assert_eq!(dom.get_sample_count(), 2);
        assert_eq!(devtools.get_sample_count(), 1);
        assert_eq!(devtools.get_sample_sum(), 0.3);
    }

    #[test]
    fn counters_increase_by_one() {
        let metrics = StorageMetrics::new();
        metrics.increase_total_sessions();
        metrics.increase_total_sessions();
        metrics.increase_total_skipped_sessions();

        assert_eq!(metrics.sessions_total.get(), 2);
        assert_eq!(metrics.sessions_skipped_total.get(), 1);
    }

    #[test]
    fn clones_share_observations() {
        let metrics = StorageMetrics::new();
        let clone = metrics.clone();
        clone.increase_total_sessions();

        assert_eq!(metrics.sessions_total.get(), 1);
    }

    #[test]
    fn collectors_cover_every_metric_in_order() {
        let metrics = StorageMetrics::new();
        assert_eq!(collector_names(&metrics), ALL_METRIC_NAMES);
        assert_eq!(collector_names(&metrics), collector_names(&metrics));
    }

    #[test]
    fn histograms_carry_only_the_file_type_label() {
        let metrics = StorageMetrics::new();
        for collector in metrics.collectors() {
            for desc in collector.desc() {
                if desc.fq_name.ends_with("_total") {
                    assert!(desc.variable_labels.is_empty(), "{}", desc.fq_name);
                } else {
                    assert_eq!(desc.variable_labels, vec![FILE_TYPE_LABEL.to_string()]);
                }
            }
        }
    }

    #[test]
    fn collectors_registered_elsewhere_expose_the_same_state() {
        let metrics = StorageMetrics::new();
        let external = Registry::new();
        metrics
            .register_into(&external)
            .expect("Failed to register into external registry");

        metrics.increase_total_sessions();
        metrics.record_upload_duration(250.0, "dom");

        let text = render_registry(&external);
        assert!(text.contains("storage_sessions_total 1"));
        assert!(text.contains("storage_upload_duration_seconds_sum{file_type=\"dom\"} 0.25"));
    }

    #[test]
    fn registering_twice_is_rejected() {
        let metrics = StorageMetrics::new();
        let result = metrics.register_into(metrics.registry());
        assert!(matches!(result, Err(MetricsError::Prometheus(_))));
    }

    #[test]
    fn invalid_buckets_are_rejected() {
        let buckets = BucketConfig {
            duration: vec![5.0, 1.0],
            ..Default::default()
        };
        assert!(matches!(
            StorageMetrics::with_buckets(&buckets),
            Err(MetricsError::InvalidBuckets { .. })
        ));
    }

    #[test]
    fn custom_buckets_are_rendered() {
        let buckets = BucketConfig {
            duration: vec![0.75, 3.0],
            ..Default::default()
        };
        let metrics = StorageMetrics::with_buckets(&buckets).expect("valid buckets");
        metrics.record_sort_duration(500.0, "dom");

        let text = metrics.render().expect("Failed to render metrics");
        assert!(text.contains("storage_sort_duration_seconds_bucket{file_type=\"dom\",le=\"0.75\"} 1"));
        assert!(text.contains("storage_sort_duration_seconds_bucket{file_type=\"dom\",le=\"3\"} 1"));
    }

    #[test]
    fn render_includes_help_text() {
        let metrics = StorageMetrics::new();
        metrics.increase_total_skipped_sessions();

        let text = metrics.render().expect("Failed to render metrics");
        assert!(text.contains(
            "# HELP storage_sessions_skipped_total A counter displaying the total number of all skipped sessions because of the size limits."
        ));
        assert!(text.contains("# TYPE storage_sessions_skipped_total counter"));
    }
}
