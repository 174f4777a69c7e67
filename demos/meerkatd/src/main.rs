//! meerkatd: runs an operator over factory-built monitors and logs every alarm.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use meerkat_core::{Monitor, MonitorFactory, Operator, OperatorConfig, Subscribe};
use meerkat_model::MonitorSettings;
use meerkat_observe::{Journal, LoggerConfig, LoggerFormat, logger_init};
use meerkat_prometheus::PrometheusMetrics;

#[derive(Parser, Debug)]
#[command(name = "meerkatd")]
#[command(about = "Periodic monitoring daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Seconds between check cycles
    #[arg(long, env = "MEERKAT_INTERVAL", default_value_t = 10)]
    interval: u64,

    /// Seconds a single check or heartbeat may take
    #[arg(long, env = "MEERKAT_CHECK_TIMEOUT", default_value_t = 10)]
    check_timeout: u64,

    /// Monitor codes to run (repeatable)
    #[arg(long = "monitor", default_values_t = [String::from("FMC")])]
    monitors: Vec<String>,

    /// Monitor setting applied to every monitor, as key=value (repeatable)
    #[arg(long = "set", value_parser = parse_setting)]
    settings: Vec<(String, String)>,

    /// Request a heartbeat from all monitors every N seconds
    #[arg(long)]
    heartbeat_every: Option<u64>,

    /// Print the known monitor kinds and exit
    #[arg(long)]
    list: bool,

    /// Log filter, e.g. `info` or `meerkat_core=debug,info`
    #[arg(long, env = "MEERKAT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output: text, json or journald
    #[arg(long, env = "MEERKAT_LOG_FORMAT", default_value = "text")]
    log_format: LoggerFormat,
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Builds one monitor per code; instance names must be unique in the registry.
fn create_monitors(
    factory: &MonitorFactory,
    codes: &[String],
) -> anyhow::Result<Vec<Arc<dyn Monitor>>> {
    let mut monitors: Vec<Arc<dyn Monitor>> = Vec::with_capacity(codes.len());
    for code in codes {
        let monitor = factory
            .create(code)
            .with_context(|| format!("cannot create monitor '{code}'"))?;
        if monitors.iter().any(|m| m.name() == monitor.name()) {
            anyhow::bail!(
                "monitor code '{code}' builds '{}', which is already configured",
                monitor.name()
            );
        }
        monitors.push(monitor);
    }
    Ok(monitors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) Logger
    logger_init(&LoggerConfig::new(cli.log_format, cli.log_level.clone()))?;
    info!("logger initialized");

    // 2) Factory
    let mut factory = MonitorFactory::new();
    meerkat_monitors::register_all(&mut factory);
    if cli.list {
        for info in factory.get_all_monitor_info() {
            println!("{}\t{}", info.code, info.name);
        }
        return Ok(());
    }

    // 3) Operator
    let metrics = PrometheusMetrics::new()?;
    let subscribers: Vec<Arc<dyn Subscribe>> =
        vec![Arc::new(Journal::new()), Arc::new(metrics.clone())];
    let config = OperatorConfig::default()
        .with_interval(Duration::from_secs(cli.interval))
        .with_check_timeout(Duration::from_secs(cli.check_timeout));
    let operator = Operator::builder(config)
        .with_subscribers(subscribers)
        .build()
        .context("invalid operator configuration")?;

    operator.set_alarm_listener(|msg| warn!(target: "meerkat::alarm", "{msg}"));
    operator.set_exception_listener(|msg| error!(target: "meerkat::alarm", "{msg}"));

    // 4) Monitors
    let settings: MonitorSettings = cli.settings.iter().cloned().collect();
    let monitors = create_monitors(&factory, &cli.monitors)?;
    for (code, monitor) in cli.monitors.iter().zip(monitors) {
        let name = monitor.name().to_string();
        operator.register_monitor(monitor);
        if !settings.is_empty() {
            operator
                .set_config(&name, &settings)
                .with_context(|| format!("cannot configure monitor '{name}'"))?;
        }
        info!(
            code = %code,
            monitor = %name,
            kind = factory.get_name(code).unwrap_or("unknown"),
            "monitor registered"
        );
    }

    // 5) Run
    operator.start()?;
    info!(monitors = ?operator.get_monitor_list(), "monitoring; press Ctrl+C to stop");

    if let Some(secs) = cli.heartbeat_every.filter(|s| *s > 0) {
        let op = operator.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(secs));
            tick.tick().await;
            loop {
                tick.tick().await;
                op.get_heartbeat();
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");

    // 6) Shutdown
    operator.stop();
    let op = operator.clone();
    let stopped =
        tokio::task::spawn_blocking(move || op.wait_stopped(Duration::from_secs(30))).await?;
    if !stopped {
        warn!("operator did not stop within 30s");
    }
    for name in operator.get_monitor_list() {
        if let Some(analysis) = operator.get_analysis_result(&name) {
            info!(monitor = %name, analysis = %analysis.message, "last analysis");
        }
    }
    info!(metrics = %metrics.encode_text()?, "final metrics");

    Ok(())
}
