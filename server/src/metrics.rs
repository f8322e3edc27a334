//! Business metrics for the order service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `courier.orders.created{order_type}` - Orders placed
//! - `courier.orders.claimed` - Successful driver claims
//! - `courier.orders.claim_conflicts` - Claims lost to another driver
//! - `courier.orders.transitions{to}` - Status changes by target status
//! - `courier.orders.ratings` - Ratings recorded
//! - `courier.store.guard_misses` - Guarded updates that matched no row
//! - `courier.http.errors{code}` - Error responses by error code

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on `address` and describe every metric.
///
/// # Errors
///
/// Returns an error if the address is invalid or the exporter cannot bind.
pub fn install(address: &str) -> anyhow::Result<()> {
    let address: SocketAddr = address
        .parse()
        .with_context(|| format!("Invalid metrics address: {address}"))?;

    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .context("Failed to install Prometheus exporter")?;

    register_business_metrics();
    tracing::info!(%address, "Metrics exporter listening");
    Ok(())
}

/// Register descriptions for every metric the service records.
pub fn register_business_metrics() {
    describe_counter!("courier.orders.created", "Orders placed, by order type");
    describe_counter!("courier.orders.claimed", "Orders claimed by a driver");
    describe_counter!(
        "courier.orders.claim_conflicts",
        "Claims that lost the race for an order"
    );
    describe_counter!(
        "courier.orders.transitions",
        "Order status changes, by target status"
    );
    describe_counter!("courier.orders.ratings", "Ratings recorded");
    describe_counter!(
        "courier.store.guard_misses",
        "Guarded order updates that matched no row"
    );
    describe_counter!("courier.http.errors", "Error responses, by error code");
}
