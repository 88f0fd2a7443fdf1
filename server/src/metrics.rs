//! Prometheus metrics for the ticket service.
//!
//! The service records through the `metrics` facade; this module installs
//! the Prometheus recorder and serves the rendered text on its own listener.
//!
//! # Example
//!
//! ```rust,no_run
//! use ticketbox_server::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start().await?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),

    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),

    /// Failed to bind HTTP server
    #[error("Failed to bind metrics server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Prometheus metrics server.
///
/// Exposes metrics on `GET /metrics` for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and start serving `/metrics`.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed, or the
    /// listener cannot bind.
    pub async fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let handle = recorder_builder()?
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        let listener = TcpListener::bind(self.addr).await?;
        let render_handle = handle.clone();
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let handle = render_handle.clone();
                async move { handle.render() }
            }),
        );

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Metrics server stopped");
            }
        });

        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        self.handle = Some(handle);
        Ok(())
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Exporter with latency buckets for every `*_duration_seconds` histogram.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the bucket configuration is rejected.
pub fn recorder_builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "ticket_purchases_total",
        "Purchase attempts by outcome (success, invalid, not_found, sold_out, insufficient, timeout, error)"
    );
    describe_histogram!(
        "ticket_purchase_duration_seconds",
        "Time from purchase request to commit or rejection"
    );
    describe_counter!(
        "ticket_cache_lookups_total",
        "Ticket cache lookups by outcome (hit, miss, error)"
    );
    describe_counter!(
        "ticket_cache_write_failures_total",
        "Failed attempts to populate the ticket cache"
    );
    describe_counter!(
        "ticket_cache_invalidation_failures_total",
        "Failed cache invalidations after a committed purchase"
    );
    describe_counter!("tickets_created_total", "Ticket types created");
}
