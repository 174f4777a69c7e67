//! Operator lifecycle events and their observers.

mod bus;
pub(crate) use bus::Bus;

use std::time::Duration;

use meerkat_model::MonitorName;

/// Which kind of fan-out a cycle performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
    Check,
    Heartbeat,
}

impl CycleKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleKind::Check => "check",
            CycleKind::Heartbeat => "heartbeat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // lifecycle
    OperatorStarted,
    StopRequested,
    OperatorStopped,

    // registry
    MonitorRegistered,
    MonitorUnregistered,
    MonitorRejected,

    // cycles
    CycleStarted,
    CycleFinished,
    CycleFailed,
    TimerArmed,

    // per-monitor outcomes
    CheckFailed,
    AlarmRaised,
    HeartbeatFailed,
    HeartbeatRejected,

    // delivery
    TaskRejected,
}

/// A single observable fact about the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub cycle: Option<CycleKind>,
    pub monitor: Option<MonitorName>,
    pub reason: Option<String>,
    pub delay_ms: Option<u64>,
    pub elapsed_ms: Option<u64>,
    pub monitors: Option<usize>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            cycle: None,
            monitor: None,
            reason: None,
            delay_ms: None,
            elapsed_ms: None,
            monitors: None,
        }
    }

    #[inline]
    pub fn with_cycle(mut self, cycle: CycleKind) -> Self {
        self.cycle = Some(cycle);
        self
    }

    #[inline]
    pub fn with_monitor(mut self, name: impl Into<MonitorName>) -> Self {
        self.monitor = Some(name.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(duration_ms(delay));
        self
    }

    #[inline]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(duration_ms(elapsed));
        self
    }

    #[inline]
    pub fn with_monitors(mut self, count: usize) -> Self {
        self.monitors = Some(count);
        self
    }
}

/// Observer of operator events.
///
/// Called synchronously on the thread that produced the event (usually the
/// worker thread), so implementations must return quickly.
pub trait Subscribe: Send + Sync + 'static {
    fn on_event(&self, event: &Event);

    fn name(&self) -> &'static str;
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
