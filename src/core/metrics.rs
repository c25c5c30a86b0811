use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn enrollment_created(status: &'static str) {
    metrics::counter!("enrollments_created_total", "status" => status).increment(1);
}

pub(crate) fn reward_claimed(kind: &'static str) {
    metrics::counter!("rewards_claimed_total", "kind" => kind).increment(1);
}

pub(crate) fn promo_code_applied() {
    metrics::counter!("promo_codes_applied_total").increment(1);
}

/// Best-effort work (notifications, email, receipt cleanup) that failed after the main write.
pub(crate) fn side_effect_failed(kind: &'static str) {
    metrics::counter!("side_effect_failures_total", "kind" => kind).increment(1);
}
