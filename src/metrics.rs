use metrics::{Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use std::time::Instant;

pub const CADDYGEN_COMPILATIONS_TOTAL: &str = "caddygen_compilations_total";
pub const CADDYGEN_COMPILE_DURATION_SECONDS: &str = "caddygen_compile_duration_seconds";
pub const CADDYGEN_COMPILED_SITES: &str = "caddygen_compiled_sites";
pub const CADDYGEN_PROXY_COMMANDS_TOTAL: &str = "caddygen_proxy_commands_total";
pub const CADDYGEN_CONFIG_SAVES_TOTAL: &str = "caddygen_config_saves_total";

static DESCRIBED: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        CADDYGEN_COMPILATIONS_TOTAL,
        Unit::Count,
        "Total number of configuration compilations."
    );
    describe_histogram!(
        CADDYGEN_COMPILE_DURATION_SECONDS,
        Unit::Seconds,
        "Time spent compiling a configuration document."
    );
    describe_gauge!(
        CADDYGEN_COMPILED_SITES,
        "Number of site blocks in the most recent compilation."
    );
    describe_counter!(
        CADDYGEN_PROXY_COMMANDS_TOTAL,
        Unit::Count,
        "Proxy lifecycle commands run, by command and outcome."
    );
    describe_counter!(
        CADDYGEN_CONFIG_SAVES_TOTAL,
        Unit::Count,
        "Structured configuration saves, by outcome."
    );
});

/// Install the Prometheus recorder and describe every metric.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Lazy::force(&DESCRIBED);
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

pub fn record_compilation(outcome: &str, sites: usize) {
    counter!(CADDYGEN_COMPILATIONS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    gauge!(CADDYGEN_COMPILED_SITES).set(sites as f64);
}

pub fn record_proxy_command(command: &str, outcome: &str) {
    counter!(
        CADDYGEN_PROXY_COMMANDS_TOTAL,
        "command" => command.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_config_save(outcome: &str) {
    counter!(CADDYGEN_CONFIG_SAVES_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

// Records compile latency on drop
pub struct CompileTimer {
    start: Instant,
}

impl CompileTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for CompileTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CompileTimer {
    fn drop(&mut self) {
        histogram!(CADDYGEN_COMPILE_DURATION_SECONDS).record(self.start.elapsed().as_secs_f64());
    }
}
