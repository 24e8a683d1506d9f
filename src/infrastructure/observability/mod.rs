//! Observability infrastructure - Tracing, Metrics, and Logging

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_background_dropped, record_cache_degraded,
    record_gateway_request, record_http_request, record_llm_request, record_rejection,
    LlmRequestMetricParams, PrometheusMetrics,
};
pub use tracing_setup::{init_tracing, TracingGuard};
