use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static CHECKOUT_TRANSACTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENT_AMOUNT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENT_VERIFICATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

fn counter(name: &str, help: &str, labels: &[&str]) -> anyhow::Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|e| anyhow::anyhow!("Failed to create {} metric: {}", name, e))
}

/// Install the HTTP metrics recorder and the checkout counters. Calling it
/// again after a successful install is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    let registry = Registry::new();

    let transactions = counter(
        "checkout_transactions_total",
        "Checkout transactions by provider and status",
        &["provider", "status"],
    )?;
    // Settled amounts in minor units (cents) per provider and currency.
    let amounts = counter(
        "payment_amount_total",
        "Settled payment amounts by provider and currency (in smallest unit)",
        &["provider", "currency"],
    )?;
    let verifications = counter(
        "payment_verifications_total",
        "Provider verification and capture outcomes",
        &["provider", "outcome"],
    )?;

    for collector in [&transactions, &amounts, &verifications] {
        registry
            .register(Box::new(collector.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register checkout metric: {}", e))?;
    }

    let _ = METRICS_HANDLE.set(handle);
    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = CHECKOUT_TRANSACTIONS_TOTAL.set(transactions);
    let _ = PAYMENT_AMOUNT_TOTAL.set(amounts);
    let _ = PAYMENT_VERIFICATIONS_TOTAL.set(verifications);

    Ok(())
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_transaction(provider: &str, status: &str) {
    if let Some(counter) = CHECKOUT_TRANSACTIONS_TOTAL.get() {
        counter.with_label_values(&[provider, status]).inc();
    }
}

pub fn record_amount(provider: &str, currency: &str, amount: Decimal) {
    let minor_units = (amount * Decimal::ONE_HUNDRED).round().to_u64();
    if let (Some(counter), Some(minor_units)) = (PAYMENT_AMOUNT_TOTAL.get(), minor_units) {
        counter
            .with_label_values(&[provider, currency])
            .inc_by(minor_units);
    }
}

pub fn record_verification(provider: &str, outcome: &str) {
    if let Some(counter) = PAYMENT_VERIFICATIONS_TOTAL.get() {
        counter.with_label_values(&[provider, outcome]).inc();
    }
}
