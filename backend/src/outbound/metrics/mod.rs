//! Prometheus-backed metrics adapters, compiled with the `metrics` feature.

mod prometheus_allocation;

pub use prometheus_allocation::PrometheusAllocationMetrics;
