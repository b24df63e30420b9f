use std::net::SocketAddr;

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up before the first run).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_documents_total", "Documents written to the content store.");
        describe_counter!("fetch_bytes_total", "Bytes downloaded from feed sources.");
        describe_counter!("fetch_errors_total", "Feed download failures.");
        describe_counter!(
            "parse_fields_total",
            "Field extraction outcomes by field and outcome."
        );
        describe_histogram!("parse_ms", "Parse stage time in milliseconds.");
        describe_counter!("persist_rows_total", "Rows inserted and committed, by table.");
        describe_counter!("persist_rollbacks_total", "Persist transactions rolled back.");
        describe_counter!("stage_retries_total", "Stage re-invocations after a failure.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last completed a run."
        );
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
