//! Prometheus metrics for the pricing endpoint

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use tarifa_common::{Result, TarifaError};

/// Pricing counters, registered on a private registry
pub struct PricingMetrics {
    registry: Registry,
    pub line_items_priced: IntCounter,
    pub products_not_found: IntCounter,
    pub batches_rejected: IntCounter,
    pub batch_duration: Histogram,
}

impl PricingMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let line_items_priced = IntCounter::new(
            "tarifa_line_items_priced_total",
            "Line items priced across all batches",
        )
        .map_err(metrics_error)?;
        let products_not_found = IntCounter::new(
            "tarifa_products_not_found_total",
            "Line items whose product could not be resolved",
        )
        .map_err(metrics_error)?;
        let batches_rejected = IntCounter::new(
            "tarifa_batches_rejected_total",
            "Pricing batches that failed as a whole",
        )
        .map_err(metrics_error)?;
        let batch_duration = Histogram::with_opts(
            HistogramOpts::new("tarifa_batch_duration_seconds", "Time to price one batch")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(line_items_priced.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(products_not_found.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(batches_rejected.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(batch_duration.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            line_items_priced,
            products_not_found,
            batches_rejected,
            batch_duration,
        })
    }

    /// Prometheus text exposition
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| TarifaError::Internal(e.to_string()))
    }
}

fn metrics_error(err: prometheus::Error) -> TarifaError {
    TarifaError::Internal(format!("metrics: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = PricingMetrics::new().unwrap();
        metrics.line_items_priced.inc_by(3);
        metrics.batch_duration.observe(0.002);

        let text = metrics.render().unwrap();
        assert!(text.contains("tarifa_line_items_priced_total 3"));
        assert!(text.contains("tarifa_batch_duration_seconds_count 1"));
    }
}
