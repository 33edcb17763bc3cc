//! Prometheus metrics for classifications, batches and lexicon reloads.

use axum::{routing::get, Router};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

use crate::aggregate::BatchStatistics;
use crate::policy::Label;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process. Returns `None` if
    /// another recorder is already installed.
    pub fn init() -> Option<Self> {
        let handle = HANDLE.get_or_try_init(|| PrometheusBuilder::new().install_recorder());
        match handle {
            Ok(h) => Some(Self { handle: h.clone() }),
            Err(e) => {
                warn!(error = %e, "prometheus recorder not installed");
                None
            }
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn record_classification(label: Label) {
    counter!("review_classifications_total", "label" => label.as_str()).increment(1);
}

pub fn record_batch(stats: &BatchStatistics) {
    counter!("review_batches_total").increment(1);
    histogram!("review_batch_size").record(stats.total as f64);
    for (label, n) in [
        (Label::Positive, stats.positive),
        (Label::Negative, stats.negative),
        (Label::Undetermined, stats.neutral),
        (Label::Error, stats.errors),
    ] {
        counter!("review_classifications_total", "label" => label.as_str()).increment(n);
    }
}

pub fn record_batch_rejected() {
    counter!("review_batch_rejected_total").increment(1);
}

pub fn record_reload(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("review_lexicon_reloads_total", "outcome" => outcome).increment(1);
}
