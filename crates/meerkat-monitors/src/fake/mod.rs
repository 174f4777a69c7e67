use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use meerkat_core::{Monitor, MonitorError, MonitorFactory};
use meerkat_model::{Analysis, CheckResult, Heartbeat, MonitorSettings};
use tracing::{debug, trace};

pub const FAKE_MONITOR_CODE: &str = "FMC";
pub const FAKE_MONITOR_NAME: &str = "Fake Monitor";

const AVAILABLE_TYPES: [&str; 3] = ["A", "B", "C"];
const SETTING_KEYS: [&str; 2] = ["type", "event_every"];

struct State {
    kind: &'static str,
    event_every: Option<u64>,
    analysis: Option<Analysis>,
}

/// Synthetic monitor producing numbered data points.
///
/// Useful for wiring tests and demos: every check succeeds, and with
/// `event_every = k` every k-th data point is treated as an event that raises
/// an alarm while alarms are enabled.
pub struct FakeMonitor {
    name: String,
    seq: AtomicU64,
    alarm_on: AtomicBool,
    state: Mutex<State>,
}

impl Default for FakeMonitor {
    fn default() -> Self {
        Self::new("fake")
    }
}

impl FakeMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seq: AtomicU64::new(0),
            alarm_on: AtomicBool::new(true),
            state: Mutex::new(State {
                kind: AVAILABLE_TYPES[0],
                event_every: None,
                analysis: None,
            }),
        }
    }

    pub fn with_event_every(self, every: u64) -> Self {
        self.state().event_every = (every > 0).then_some(every);
        self
    }

    /// Currently configured data type.
    pub fn kind(&self) -> &'static str {
        self.state().kind
    }

    /// Number of checks performed so far.
    pub fn checks(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Monitor for FakeMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn do_check(&self) -> Result<CheckResult, MonitorError> {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let nth = ordinal(n);

        let mut state = self.state();
        state.analysis = Some(Analysis::new(format!("{nth} data (type {})", state.kind)));
        let is_event = state.event_every.is_some_and(|k| n % k == 0);
        drop(state);

        trace!(monitor = %self.name, n, is_event, "fake data produced");
        if is_event && self.alarm_on.load(Ordering::SeqCst) {
            return Ok(CheckResult::alarm(format!("data contains events ({nth} data)")));
        }
        Ok(CheckResult::ok())
    }

    async fn get_heartbeat(&self) -> Result<Heartbeat, MonitorError> {
        let alarm = if self.alarm_on.load(Ordering::SeqCst) {
            "on"
        } else {
            "off"
        };
        Ok(Heartbeat::healthy(format!("monitoring normally (alarm {alarm})")))
    }

    fn set_alarm(&self, on: bool) {
        self.alarm_on.store(on, Ordering::SeqCst);
    }

    fn get_analysis(&self) -> Option<Analysis> {
        self.state().analysis.clone()
    }

    fn config_info(&self) -> Option<String> {
        Some(format!(
            "type can be one of {}. e.g. type=A; event_every=<n> raises an alarm every n-th check",
            AVAILABLE_TYPES.join(", ")
        ))
    }

    fn set_config(&self, settings: &MonitorSettings) -> Result<(), MonitorError> {
        if let Some(key) = settings.unknown_key(&SETTING_KEYS) {
            return Err(MonitorError::InvalidConfig(format!("unknown setting: {key}")));
        }
        let kind = match settings.get("type") {
            Some(value) => Some(
                AVAILABLE_TYPES
                    .iter()
                    .copied()
                    .find(|t| *t == value)
                    .ok_or_else(|| MonitorError::InvalidConfig(format!("unknown type: {value}")))?,
            ),
            None => None,
        };
        let every = match settings.get("event_every") {
            Some(value) => Some(value.parse::<u64>().map_err(|e| {
                MonitorError::InvalidConfig(format!("event_every '{value}': {e}"))
            })?),
            None => None,
        };
        if kind.is_none() && every.is_none() {
            return Err(MonitorError::InvalidConfig(
                "expected at least one of: type, event_every".into(),
            ));
        }

        let mut state = self.state();
        if let Some(kind) = kind {
            state.kind = kind;
        }
        if let Some(every) = every {
            state.event_every = (every > 0).then_some(every);
        }
        debug!(
            monitor = %self.name,
            kind = state.kind,
            event_every = ?state.event_every,
            "fake monitor configured"
        );
        Ok(())
    }
}

/// Registers [`FakeMonitor`] under [`FAKE_MONITOR_CODE`].
pub fn register_fake_monitor(factory: &mut MonitorFactory) {
    factory.register(FAKE_MONITOR_CODE, FAKE_MONITOR_NAME, || {
        Arc::new(FakeMonitor::default()) as Arc<dyn Monitor>
    });
}

fn ordinal(n: u64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
