//! Shared application state.

use crate::metrics::StorageMetrics;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage metric set served on `/metrics`.
    pub metrics: StorageMetrics,
}
