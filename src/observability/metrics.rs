//! Metrics for the notification pipeline
//!
//! Recording goes through the `metrics` facade and `init` installs a Prometheus
//! recorder. A run is short-lived, so totals leave the process through
//! `push_summary` when a Pushgateway is configured.

use crate::constants::ENV_PUSHGATEWAY_URL;
use crate::types::RunSummary;
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Every metric the pipeline records. Keeps names out of call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Source
    RowsRead,

    // Validation
    RecordsInvalid,

    // Dispatch
    BatchesDispatched,
    BatchesFailed,
    AddressesDelivered,
    AddressesFailed,
    DispatchDuration,
    RateLimitWait,

    // Ledger
    LedgerWritesSuccess,
    LedgerWritesError,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RowsRead => "batch_notifier_rows_read_total",
            MetricName::RecordsInvalid => "batch_notifier_records_invalid_total",
            MetricName::BatchesDispatched => "batch_notifier_batches_dispatched_total",
            MetricName::BatchesFailed => "batch_notifier_batches_failed_total",
            MetricName::AddressesDelivered => "batch_notifier_addresses_delivered_total",
            MetricName::AddressesFailed => "batch_notifier_addresses_failed_total",
            MetricName::DispatchDuration => "batch_notifier_dispatch_duration_seconds",
            MetricName::RateLimitWait => "batch_notifier_rate_limit_wait_seconds",
            MetricName::LedgerWritesSuccess => "batch_notifier_ledger_writes_success_total",
            MetricName::LedgerWritesError => "batch_notifier_ledger_writes_error_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RowsRead,
            RecordsInvalid,
            BatchesDispatched,
            BatchesFailed,
            AddressesDelivered,
            AddressesFailed,
            DispatchDuration,
            RateLimitWait,
            LedgerWritesSuccess,
            LedgerWritesError,
        ]
        .into_iter()
    }

    /// (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::RowsRead => ("source", "Input rows read", None),
            MetricName::RecordsInvalid => ("validation", "Rows rejected by address validation", None),
            MetricName::BatchesDispatched => ("dispatch", "Batches sent to the notify API", None),
            MetricName::BatchesFailed => ("dispatch", "Batches the notify API rejected", None),
            MetricName::AddressesDelivered => ("dispatch", "Addresses in delivered batches", None),
            MetricName::AddressesFailed => ("dispatch", "Addresses in rejected batches", None),
            MetricName::DispatchDuration => ("dispatch", "Notify API call duration", Some("s")),
            MetricName::RateLimitWait => ("dispatch", "Time spent waiting on the dispatch floor", Some("s")),
            MetricName::LedgerWritesSuccess => ("ledger", "Successful ledger appends", None),
            MetricName::LedgerWritesError => ("ledger", "Failed ledger appends", None),
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = HANDLE.set(handle);

    for name in MetricName::all_metrics() {
        let (phase, help, unit) = name.metadata();
        let description = format!("[{}] {}", phase, help);
        if unit.is_some() {
            ::metrics::describe_histogram!(name.as_str(), description);
        } else {
            ::metrics::describe_counter!(name.as_str(), description);
        }
    }
    info!("Metrics system initialized");
    Ok(())
}

/// Push the run totals to a Pushgateway when `BATCH_NOTIFIER_PUSHGATEWAY_URL`
/// is set. Best effort: failures are logged, never returned.
pub async fn push_summary(summary: &RunSummary, instance: &str) {
    let base = match std::env::var(ENV_PUSHGATEWAY_URL) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return,
    };
    let push_url = format!(
        "{}/metrics/job/{}/instance/{}",
        base.trim_end_matches('/'),
        "batch_notifier",
        instance
    );
    let body = summary_exposition(summary, chrono::Utc::now().timestamp());

    let client = reqwest::Client::new();
    match client
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => info!("Pushed run metrics to Pushgateway"),
        Ok(r) => warn!("Pushgateway push responded with status {}", r.status().as_u16()),
        Err(e) => warn!("Pushgateway push failed: {}", e),
    }
}

fn summary_exposition(summary: &RunSummary, timestamp_secs: i64) -> String {
    format!(
        "# TYPE {rows} counter\n{rows} {}\n\
         # TYPE {invalid} counter\n{invalid} {}\n\
         # TYPE {batches} counter\n{batches} {}\n\
         # TYPE {batches_failed} counter\n{batches_failed} {}\n\
         # TYPE {delivered} counter\n{delivered} {}\n\
         # TYPE {failed} counter\n{failed} {}\n\
         # TYPE batch_notifier_last_run_timestamp_seconds gauge\n\
         batch_notifier_last_run_timestamp_seconds {}\n",
        summary.rows_read,
        summary.invalid,
        summary.batches_dispatched,
        summary.batches_failed,
        summary.delivered,
        summary.failed,
        timestamp_secs,
        rows = MetricName::RowsRead,
        invalid = MetricName::RecordsInvalid,
        batches = MetricName::BatchesDispatched,
        batches_failed = MetricName::BatchesFailed,
        delivered = MetricName::AddressesDelivered,
        failed = MetricName::AddressesFailed,
    )
}

// ============================================================================
// Source Metrics
// ============================================================================

pub mod source {
    use super::MetricName;

    /// Record one input row read
    pub fn row_read() {
        ::metrics::counter!(MetricName::RowsRead.as_str()).increment(1);
    }
}

// ============================================================================
// Validation Metrics
// ============================================================================

pub mod validation {
    use super::MetricName;

    /// Record a row that failed address validation
    pub fn record_invalid() {
        ::metrics::counter!(MetricName::RecordsInvalid.as_str()).increment(1);
    }
}

// ============================================================================
// Dispatch Metrics
// ============================================================================

pub mod dispatch {
    use super::MetricName;

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::DispatchDuration.as_str()).record(secs);
    }

    pub fn rate_limit_wait(secs: f64) {
        ::metrics::histogram!(MetricName::RateLimitWait.as_str()).record(secs);
    }

    /// Record a batch the notify API accepted
    pub fn batch_delivered(size: u64) {
        ::metrics::counter!(MetricName::BatchesDispatched.as_str()).increment(1);
        ::metrics::counter!(MetricName::AddressesDelivered.as_str()).increment(size);
    }

    /// Record a batch the notify API rejected
    pub fn batch_failed(size: u64) {
        ::metrics::counter!(MetricName::BatchesDispatched.as_str()).increment(1);
        ::metrics::counter!(MetricName::BatchesFailed.as_str()).increment(1);
        ::metrics::counter!(MetricName::AddressesFailed.as_str()).increment(size);
    }
}

// ============================================================================
// Ledger Metrics
// ============================================================================

pub mod ledger {
    use super::MetricName;

    pub fn write_success() {
        ::metrics::counter!(MetricName::LedgerWritesSuccess.as_str()).increment(1);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::LedgerWritesError.as_str()).increment(1);
    }
}
