use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response};
use figment::{
    Figment,
    providers::{Format, Yaml},
};
use storage_metrics::config::{ConfigV1, extract_config};
use storage_metrics::metrics::StorageMetrics;
use storage_metrics::routes::create_router;
use storage_metrics::state::AppState;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
bind_address: 127.0.0.1:9187
logging:
  level: "debug"
  format: "json"
buckets:
  duration: [0.1, 1, 10]
"#;

pub fn load_test_config() -> ConfigV1 {
    extract_config(Figment::new().merge(Yaml::string(TEST_CONFIG)))
        .expect("Failed to parse test config YAML")
}

pub fn build_app(config: ConfigV1) -> (Router, StorageMetrics) {
    let metrics =
        StorageMetrics::with_buckets(&config.buckets).expect("Failed to build storage metrics");

    let state = AppState {
        metrics: metrics.clone(),
    };

    (create_router(state), metrics)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body is not UTF-8")
}
