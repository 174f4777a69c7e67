use meerkat_core::{Event, EventKind, Subscribe};
use prometheus::{
    Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    core::Collector, proto::MetricFamily,
};

use crate::error::MetricsError;

const UNKNOWN: &str = "unknown";

/// Operator metrics backed by a Prometheus registry.
///
/// Clones share the same collectors and registry.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    cycles_total: IntCounterVec,
    cycle_failures_total: IntCounterVec,
    cycle_duration_seconds: HistogramVec,
    check_failures_total: IntCounterVec,
    heartbeat_failures_total: IntCounterVec,
    alarms_total: IntCounterVec,
    timer_delay_seconds: Gauge,
    operator_running: IntGauge,
}

impl PrometheusMetrics {
    /// Registers all collectors in a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Registers all collectors in `registry`, e.g. one shared with other exporters.
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let cycles_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("meerkat_cycles_total", "Monitoring cycles started"),
                &["kind"],
            )?,
        )?;
        let cycle_failures_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("meerkat_cycle_failures_total", "Cycles that failed as a whole"),
                &["kind"],
            )?,
        )?;
        let cycle_duration_seconds = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new("meerkat_cycle_duration_seconds", "Wall time of a cycle")
                    .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
                &["kind"],
            )?,
        )?;
        let check_failures_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("meerkat_check_failures_total", "Failed monitor checks"),
                &["monitor"],
            )?,
        )?;
        let heartbeat_failures_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "meerkat_heartbeat_failures_total",
                    "Heartbeats that failed or reported not ok",
                ),
                &["monitor"],
            )?,
        )?;
        let alarms_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("meerkat_alarms_total", "Alarms raised by monitor checks"),
                &["monitor"],
            )?,
        )?;
        let timer_delay_seconds = register(
            &registry,
            Gauge::new(
                "meerkat_timer_delay_seconds",
                "Delay the periodic timer was last armed with",
            )?,
        )?;
        let operator_running = register(
            &registry,
            IntGauge::new("meerkat_operator_running", "1 while the operator is running")?,
        )?;

        Ok(Self {
            registry,
            cycles_total,
            cycle_failures_total,
            cycle_duration_seconds,
            check_failures_total,
            heartbeat_failures_total,
            alarms_total,
            timer_delay_seconds,
            operator_running,
        })
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut out = String::new();
        encoder.encode_utf8(&self.gather(), &mut out)?;
        Ok(out)
    }

    fn record(&self, event: &Event) {
        let cycle = event.cycle.map(|c| c.as_str()).unwrap_or(UNKNOWN);
        let monitor = event.monitor.as_deref().unwrap_or(UNKNOWN);

        match event.kind {
            EventKind::OperatorStarted => self.operator_running.set(1),
            EventKind::OperatorStopped => self.operator_running.set(0),
            EventKind::CycleStarted => self.cycles_total.with_label_values(&[cycle]).inc(),
            EventKind::CycleFailed => self.cycle_failures_total.with_label_values(&[cycle]).inc(),
            EventKind::CycleFinished => {
                let secs = event.elapsed_ms.unwrap_or(0) as f64 / 1_000.0;
                self.cycle_duration_seconds
                    .with_label_values(&[cycle])
                    .observe(secs);
            }
            EventKind::CheckFailed => self.check_failures_total.with_label_values(&[monitor]).inc(),
            EventKind::HeartbeatFailed => self
                .heartbeat_failures_total
                .with_label_values(&[monitor])
                .inc(),
            EventKind::AlarmRaised => self.alarms_total.with_label_values(&[monitor]).inc(),
            EventKind::TimerArmed => {
                let secs = event.delay_ms.unwrap_or(0) as f64 / 1_000.0;
                self.timer_delay_seconds.set(secs);
            }
            EventKind::StopRequested
            | EventKind::MonitorRegistered
            | EventKind::MonitorUnregistered
            | EventKind::MonitorRejected
            | EventKind::HeartbeatRejected
            | EventKind::TaskRejected => {}
        }
    }
}

impl Subscribe for PrometheusMetrics {
    fn on_event(&self, event: &Event) {
        self.record(event);
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}

fn register<C>(registry: &Registry, collector: C) -> Result<C, MetricsError>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}
