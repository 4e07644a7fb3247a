//! Prometheus metrics for the ledger and the analytics engine.
//!
//! Recorders are zero-sized structs with associated functions, so call sites
//! read `LedgerMetrics::record_distribution(elapsed)`. Without an installed
//! recorder every call is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use distribution_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! let body = server.render();
//! # Ok(())
//! # }
//! ```

use distribution_core::ErrorKind;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder and renderer.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe every metric and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed is tolerated and leaves `handle()` empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Address the metrics are meant to be scraped from.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Installs the recorder when `addr` is set.
///
/// # Errors
///
/// See [`MetricsServer::start`].
pub fn start_metrics(addr: Option<SocketAddr>) -> Result<Option<MetricsServer>, MetricsError> {
    addr.map(|addr| {
        let mut server = MetricsServer::new(addr);
        server.start().map(|()| server)
    })
    .transpose()
}

fn register_metrics() {
    describe_counter!(
        "distributions_recorded_total",
        "Total number of distributions appended to a user's log"
    );
    describe_counter!(
        "distributions_rejected_total",
        "Total number of rejected distribution appends, by error kind"
    );
    describe_counter!(
        "aggregate_drift_detected_total",
        "Times a center's totals were found out of sync with its users"
    );
    describe_counter!(
        "stock_entries_recorded_total",
        "Total number of stock entries appended"
    );
    describe_counter!(
        "analytics_queries_total",
        "Total number of analytics queries, by view"
    );
    describe_counter!(
        "storage_timeouts_total",
        "Storage calls that exceeded their deadline, by operation"
    );
    describe_histogram!(
        "ledger_operation_duration_seconds",
        "Time taken by ledger and analytics operations"
    );
    describe_counter!("read_retry_attempts_total", "Total number of read retries");
    describe_counter!(
        "read_retry_successes_total",
        "Reads that succeeded after at least one retry"
    );
    describe_counter!(
        "read_retry_exhausted_total",
        "Reads that failed after exhausting their retries"
    );
}

fn record_duration(operation: &'static str, duration: Duration) {
    histogram!("ledger_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Write-side metrics.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record a distribution whose user-side append landed.
    pub fn record_distribution(duration: Duration) {
        counter!("distributions_recorded_total").increment(1);
        record_duration("record_distribution", duration);
    }

    /// Record a failed distribution.
    pub fn record_rejection(kind: ErrorKind) {
        counter!("distributions_rejected_total", "kind" => kind.as_str()).increment(1);
    }

    /// Record a user/center divergence.
    pub fn record_drift() {
        counter!("aggregate_drift_detected_total").increment(1);
    }

    /// Record a stock entry.
    pub fn record_stock(duration: Duration) {
        counter!("stock_entries_recorded_total").increment(1);
        record_duration("record_stock", duration);
    }
}

/// Read-side metrics.
pub struct AnalyticsMetrics;

impl AnalyticsMetrics {
    /// Record one analytics query.
    pub fn record_query(view: &'static str, duration: Duration) {
        counter!("analytics_queries_total", "view" => view).increment(1);
        record_duration(view, duration);
    }
}

/// Storage deadline metrics.
pub struct StorageMetrics;

impl StorageMetrics {
    /// Record a storage call that hit its deadline.
    pub fn record_timeout(operation: &'static str) {
        counter!("storage_timeouts_total", "operation" => operation).increment(1);
    }
}

/// Read retry metrics.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt(view: &'static str) {
        counter!("read_retry_attempts_total", "view" => view).increment(1);
    }

    /// Record a successful retry.
    pub fn record_success(view: &'static str) {
        counter!("read_retry_successes_total", "view" => view).increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted(view: &'static str) {
        counter!("read_retry_exhausted_total", "view" => view).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[test]
    fn test_metrics_server_render() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        LedgerMetrics::record_distribution(Duration::from_millis(12));
        LedgerMetrics::record_rejection(ErrorKind::NotFound);
        LedgerMetrics::record_drift();
        LedgerMetrics::record_stock(Duration::from_millis(3));
        AnalyticsMetrics::record_query("stock_status", Duration::from_millis(5));
        StorageMetrics::record_timeout("increment_center");

        // Only the instance that installed the recorder can render.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("distributions_recorded_total"));
            assert!(rendered.contains("distributions_rejected_total{kind=\"not_found\"}"));
            assert!(rendered.contains("aggregate_drift_detected_total"));
            assert!(rendered.contains("analytics_queries_total{view=\"stock_status\"}"));
            assert!(rendered.contains("storage_timeouts_total{operation=\"increment_center\"}"));
            assert!(rendered.contains("ledger_operation_duration_seconds"));
        }
    }

    #[test]
    fn nothing_starts_without_an_address() {
        assert!(start_metrics(None).unwrap().is_none());
    }

    #[test]
    fn recorders_are_noops_without_a_recorder() {
        RetryMetrics::record_attempt("user_analytics");
        RetryMetrics::record_success("user_analytics");
        RetryMetrics::record_exhausted("user_analytics");
    }
}
