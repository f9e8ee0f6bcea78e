//! Component I — Prometheus-style metrics for discovery, pool, and
//! resurrection events.
//!
//! Grounded in the teacher's `metrics/registry.rs`: a thin handle around the
//! global `metrics` recorder, installed once by a host application. Library
//! code (`config_node`, `poller`, `pool`) only ever calls the `counter!`/
//! `gauge!` macros, which are no-ops until a recorder is installed — this
//! module never installs one on its own.

use metrics::{describe_counter, describe_gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Thin handle around the global metrics recorder.
///
/// After `DiscoveryMetrics::install()` the `metrics` crate macros can be
/// used anywhere in the codebase. The `PrometheusHandle` is retained solely
/// for rendering a `/metrics` endpoint.
#[derive(Clone)]
pub struct DiscoveryMetrics {
    handle: PrometheusHandle,
}

impl DiscoveryMetrics {
    /// Install the global Prometheus recorder and register metric
    /// descriptions. Must be called once at startup, before any `counter!`
    /// / `gauge!` calls — only a host binary (the demo, or a consuming
    /// application) should call this.
    pub fn install() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install metrics recorder");

        describe_counter!(
            "discovery_poll_total",
            Unit::Count,
            "Total configuration-endpoint poll attempts, by result"
        );
        describe_gauge!(
            "discovery_config_version",
            Unit::Count,
            "Greatest configuration version applied so far"
        );
        describe_gauge!(
            "pool_nodes_alive",
            Unit::Count,
            "Number of cache nodes currently considered alive"
        );
        describe_gauge!(
            "pool_nodes_dead",
            Unit::Count,
            "Number of cache nodes currently considered dead"
        );
        describe_counter!(
            "pool_resurrection_attempts_total",
            Unit::Count,
            "Total ping attempts made against dead nodes"
        );
        describe_counter!(
            "pool_node_failed_total",
            Unit::Count,
            "Total node-failure events observed by the pool"
        );

        Self { handle }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
