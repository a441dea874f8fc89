// Prometheus metrics for the rate limiter
//
// Exposes metrics on /metrics HTTP endpoint:
// - Packets checked by direction and outcome (counter)
// - Reverted send packets (counter)
// - Epoch resets by outcome (counter)
// - Active rate limits, pending send packets, current epoch (gauges)

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use crate::rate_limit::Direction;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    // Packet metrics
    pub static ref PACKETS_CHECKED_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("ratelimit_packets_checked_total", "Transfer packets checked against a quota"),
        &["direction", "outcome"]
    ).expect("Failed to create packets checked metric");

    pub static ref REVERTED_SEND_PACKETS_TOTAL: IntCounter = IntCounter::new(
        "ratelimit_reverted_send_packets_total",
        "Send packets whose outflow was given back after a failure or timeout"
    ).expect("Failed to create reverted send packets metric");

    pub static ref PENDING_SEND_PACKETS: IntGauge = IntGauge::new(
        "ratelimit_pending_send_packets",
        "Send packets awaiting acknowledgement or timeout"
    ).expect("Failed to create pending send packets metric");

    // Rate limit metrics
    pub static ref RATE_LIMITS_ACTIVE: IntGauge = IntGauge::new(
        "ratelimit_rate_limits_active",
        "Number of configured rate limits"
    ).expect("Failed to create active rate limits metric");

    // Epoch metrics
    pub static ref EPOCH_RESETS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("ratelimit_epoch_resets_total", "Rate limit resets triggered by epoch ticks"),
        &["outcome"]
    ).expect("Failed to create epoch resets metric");

    pub static ref CURRENT_EPOCH: IntGauge = IntGauge::new(
        "ratelimit_current_epoch",
        "Most recent hour epoch number processed"
    ).expect("Failed to create current epoch metric");
}

/// Initialize metrics registry - must be called once at daemon startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(PACKETS_CHECKED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REVERTED_SEND_PACKETS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PENDING_SEND_PACKETS.clone()))?;
    REGISTRY.register(Box::new(RATE_LIMITS_ACTIVE.clone()))?;
    REGISTRY.register(Box::new(EPOCH_RESETS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CURRENT_EPOCH.clone()))?;
    Ok(())
}

/// Count one packet check
pub fn record_packet(direction: Direction, outcome: &str) {
    PACKETS_CHECKED_TOTAL
        .with_label_values(&[direction.as_str(), outcome])
        .inc();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Fails when another test registered first; either way the registry is populated
        let _ = init();
        assert!(!REGISTRY.gather().is_empty());
    }

    #[test]
    fn test_record_packet() {
        let before = PACKETS_CHECKED_TOTAL
            .with_label_values(&["send", "admitted"])
            .get();
        record_packet(Direction::Send, "admitted");
        let after = PACKETS_CHECKED_TOTAL
            .with_label_values(&["send", "admitted"])
            .get();
        assert!(after > before);
    }

    #[test]
    fn test_gather_metrics_text() {
        let _ = init();
        RATE_LIMITS_ACTIVE.set(3);
        let text = gather_metrics().unwrap();
        assert!(text.contains("ratelimit_rate_limits_active"));
    }
}
