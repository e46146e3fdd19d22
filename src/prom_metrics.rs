//! # Prometheus Metrics — Exposition for Container Orchestration
//!
//! Exposes tasklane operational metrics in the Prometheus text exposition format
//! for scraping by Prometheus, Grafana Agent, or any OpenMetrics-compatible collector.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `tasklane_http_request_duration_seconds` | Histogram | `method`, `path` | Request latency |
//! | `tasklane_assignments_created_total` | Counter | — | Daily assignments inserted |
//! | `tasklane_tasks_completed_total` | Counter | `kind` | Accepted task completions |
//! | `tasklane_rewards_credited_total` | Counter | — | Balance credited by completions |
//! | `tasklane_redemptions_total` | Counter | — | Bonus redemptions |
//! | `tasklane_referrals_total` | Counter | — | Registrations that credited a referrer |
//! | `tasklane_withdrawals_total` | Counter | `status` | Withdrawal requests and resolutions |
//!
//! ## Integration
//!
//! Counters are bumped by the HTTP handlers after the storage transaction
//! commits; the histogram is fed by the request middleware. The `/metrics`
//! endpoint renders the current registry state on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for the request duration histogram. `path` is normalized so ids
/// do not explode cardinality.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct KindLabel {
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct StatusLabel {
    pub status: String,
}

fn duration_histogram() -> Histogram {
    // 1ms .. ~16s
    Histogram::new(exponential_buckets(0.001, 2.0, 15))
}

/// Thread-safe metrics registry for the tasklane API.
///
/// All fields use atomic types and are safe to update from any async task.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram, fn() -> Histogram>,
    pub assignments_created: Counter,
    pub tasks_completed: Family<KindLabel, Counter>,
    pub rewards_credited: Counter,
    pub redemptions: Counter,
    pub referrals: Counter,
    pub withdrawals: Family<StatusLabel, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("tasklane");

        let http_request_duration =
            Family::<HttpLabel, Histogram, fn() -> Histogram>::new_with_constructor(
                duration_histogram,
            );
        registry.register(
            "http_request_duration_seconds",
            "HTTP request latency by method and normalized path",
            http_request_duration.clone(),
        );

        let assignments_created = Counter::default();
        registry.register(
            "assignments_created",
            "Daily task assignments inserted",
            assignments_created.clone(),
        );

        let tasks_completed = Family::<KindLabel, Counter>::default();
        registry.register(
            "tasks_completed",
            "Accepted task completions by kind",
            tasks_completed.clone(),
        );

        let rewards_credited = Counter::default();
        registry.register(
            "rewards_credited",
            "Balance credited by task completions",
            rewards_credited.clone(),
        );

        let redemptions = Counter::default();
        registry.register(
            "redemptions",
            "Bonus to balance redemptions",
            redemptions.clone(),
        );

        let referrals = Counter::default();
        registry.register(
            "referrals",
            "Registrations that credited a referrer",
            referrals.clone(),
        );

        let withdrawals = Family::<StatusLabel, Counter>::default();
        registry.register(
            "withdrawals",
            "Withdrawal requests and resolutions by resulting status",
            withdrawals.clone(),
        );

        Self {
            registry,
            http_request_duration,
            assignments_created,
            tasks_completed,
            rewards_credited,
            redemptions,
            referrals,
            withdrawals,
        }
    }

    /// Count a withdrawal transition (`pending`, `approved`, `rejected`).
    pub fn withdrawal(&self, status: &str) {
        self.withdrawals
            .get_or_create(&StatusLabel {
                status: status.to_string(),
            })
            .inc();
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
