//! Prometheus metrics for ingestion, correlation and the idempotency stores.
//!
//! All metrics live in one process-wide registry under the `signalroot`
//! namespace and are served in text format from `GET /metrics`.

mod middleware;

pub use middleware::track_http;

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "signalroot";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Inbound webhooks accepted for processing
    ///
    /// Labels: source, kind (alert, deploy)
    pub static ref WEBHOOKS_RECEIVED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("webhooks_received_total", "Inbound webhooks received").namespace(NAMESPACE),
        &["source", "kind"]
    ).expect("Failed to create WEBHOOKS_RECEIVED_TOTAL metric");

    /// Labels: source, outcome (dropped, created, duplicate_incident, recorded, rejected)
    pub static ref WEBHOOK_OUTCOMES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("webhook_outcomes_total", "Engine decisions per inbound webhook").namespace(NAMESPACE),
        &["source", "outcome"]
    ).expect("Failed to create WEBHOOK_OUTCOMES_TOTAL metric");

    /// Labels: severity
    pub static ref INCIDENTS_CREATED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("incidents_created_total", "Incidents created by correlation").namespace(NAMESPACE),
        &["severity"]
    ).expect("Failed to create INCIDENTS_CREATED_TOTAL metric");

    /// Labels: result (sent, suppressed, failed)
    pub static ref NOTIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("notifications_total", "Notification gate decisions and deliveries").namespace(NAMESPACE),
        &["result"]
    ).expect("Failed to create NOTIFICATIONS_TOTAL metric");

    /// Labels: store (webhooks, notifications, alert_links, deploys, incidents)
    pub static ref SWEEP_EVICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("sweep_evictions_total", "Entries removed by the cleanup sweeper").namespace(NAMESPACE),
        &["store"]
    ).expect("Failed to create SWEEP_EVICTIONS_TOTAL metric");

    /// Labels: store (webhooks, notifications, alert_links)
    pub static ref IDEMPOTENCY_ENTRIES: GaugeVec = GaugeVec::new(
        Opts::new("idempotency_entries", "Entries currently held per idempotency store").namespace(NAMESPACE),
        &["store"]
    ).expect("Failed to create IDEMPOTENCY_ENTRIES metric");

    /// Labels: kind (alert, deploy)
    pub static ref INGEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("ingest_duration_seconds", "Time spent in the engine per inbound event")
            .namespace(NAMESPACE)
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["kind"]
    ).expect("Failed to create INGEST_DURATION_SECONDS metric");
}

fn register<C>(collector: &C) -> Result<(), prometheus::Error>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    match PROMETHEUS_REGISTRY.register(Box::new(collector.clone())) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register all metrics with the global registry. Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(&*HTTP_REQUESTS_TOTAL)?;
    register(&*HTTP_REQUEST_DURATION_SECONDS)?;
    register(&*WEBHOOKS_RECEIVED_TOTAL)?;
    register(&*WEBHOOK_OUTCOMES_TOTAL)?;
    register(&*INCIDENTS_CREATED_TOTAL)?;
    register(&*NOTIFICATIONS_TOTAL)?;
    register(&*SWEEP_EVICTIONS_TOTAL)?;
    register(&*IDEMPOTENCY_ENTRIES)?;
    register(&*INGEST_DURATION_SECONDS)?;

    tracing::info!("Prometheus metrics registered");
    Ok(())
}

/// Publish a stats snapshot to the entry gauges
pub fn record_store_sizes(stats: &crate::state::IdempotencyStats) {
    IDEMPOTENCY_ENTRIES
        .with_label_values(&["webhooks"])
        .set(stats.processed_webhooks as f64);
    IDEMPOTENCY_ENTRIES
        .with_label_values(&["notifications"])
        .set(stats.active_notifications as f64);
    IDEMPOTENCY_ENTRIES
        .with_label_values(&["alert_links"])
        .set(stats.alert_to_incident_mappings as f64);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::IdempotencyStats;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_gather_includes_namespace() {
        init_metrics().unwrap();
        WEBHOOK_OUTCOMES_TOTAL
            .with_label_values(&["pagerduty", "created"])
            .inc();
        record_store_sizes(&IdempotencyStats {
            processed_webhooks: 3,
            active_notifications: 1,
            alert_to_incident_mappings: 2,
        });

        let text = gather_metrics();
        assert!(text.contains("signalroot_webhook_outcomes_total"));
        assert!(text.contains("signalroot_idempotency_entries{store=\"alert_links\"} 2"));
    }
}
