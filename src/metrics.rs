//! Translation metrics
//!
//! Counters and histograms describing the work of the converter, exposed in
//! Prometheus format when an exporter is installed.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Installs the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

/// Record a successful translation
pub fn record_translation(result_type: &str, duration_ms: f64) {
    counter!("promsql.translations", "result_type" => result_type.to_string()).increment(1);
    histogram!("promsql.translation.duration_ms").record(duration_ms);
}

/// Record how many named subqueries one translation produced
pub fn record_subqueries(count: usize) {
    histogram!("promsql.translation.subqueries").record(count as f64);
}

/// Record a failed translation
pub fn record_translation_error(kind: &str) {
    counter!("promsql.translation.errors", "kind" => kind.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        // Without an installed recorder the macros are no-ops.
        record_translation("instant vector", 1.5);
        record_subqueries(3);
        record_translation_error("internal");
    }
}
