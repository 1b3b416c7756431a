// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the dispatch workflow
// ============================================================================
//
// - Orders placed and how many sellers each one reached
// - Seller responses by outcome (accepted, rejected, already_resolved)
// - Notifications published per event, and deliveries dropped
//
// Scraped via /metrics on the metrics port.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub sellers_matched: Histogram,
    pub order_responses: IntCounterVec,

    pub notifications_published: IntCounterVec,
    pub notifications_dropped: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let sellers_matched = Histogram::with_opts(
            HistogramOpts::new("sellers_matched", "Sellers notified per placed order")
                .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(sellers_matched.clone()))?;

        let order_responses = IntCounterVec::new(
            Opts::new("order_responses_total", "Seller responses by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(order_responses.clone()))?;

        let notifications_published = IntCounterVec::new(
            Opts::new("notifications_published_total", "Notifications published by event"),
            &["event"],
        )?;
        registry.register(Box::new(notifications_published.clone()))?;

        let notifications_dropped = IntCounter::new(
            "notifications_dropped_total",
            "Deliveries dropped because the session was gone",
        )?;
        registry.register(Box::new(notifications_dropped.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            sellers_matched,
            order_responses,
            notifications_published,
            notifications_dropped,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_placed(&self, matched_sellers: usize) {
        self.orders_placed.inc();
        self.sellers_matched.observe(matched_sellers as f64);
    }

    /// `outcome` is a resolved status name or `already_resolved`.
    pub fn record_response(&self, outcome: &str) {
        self.order_responses.with_label_values(&[outcome]).inc();
    }

    pub fn record_notification(&self, event: &str, dropped: usize) {
        self.notifications_published.with_label_values(&[event]).inc();
        self.notifications_dropped.inc_by(dropped as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_response("accepted");
        metrics.record_notification("newOrder", 0);
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_order_placed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_placed(2);
        metrics.record_order_placed(0);

        assert_eq!(metrics.orders_placed.get(), 2);
        assert_eq!(metrics.sellers_matched.get_sample_count(), 2);
        assert_eq!(metrics.sellers_matched.get_sample_sum(), 2.0);
    }

    #[test]
    fn test_record_responses_by_outcome() {
        let metrics = Metrics::new().unwrap();
        metrics.record_response("accepted");
        metrics.record_response("already_resolved");
        metrics.record_response("already_resolved");

        assert_eq!(metrics.order_responses.with_label_values(&["accepted"]).get(), 1);
        assert_eq!(metrics.order_responses.with_label_values(&["rejected"]).get(), 0);
        assert_eq!(metrics.order_responses.with_label_values(&["already_resolved"]).get(), 2);
    }

    #[test]
    fn test_record_notification_drops() {
        let metrics = Metrics::new().unwrap();
        metrics.record_notification("orderResponse", 3);

        assert_eq!(metrics.notifications_published.with_label_values(&["orderResponse"]).get(), 1);
        assert_eq!(metrics.notifications_dropped.get(), 3);
    }
}
