use std::borrow::Borrow;

use meerkat_core::{Event, EventKind};
use tracing::{debug, error, info, trace, warn};

/// Read accessors over an [`Event`] with log-friendly fallbacks.
pub trait View {
    fn kind(&self) -> EventKind;
    fn as_monitor(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn as_cycle(&self) -> &str;
    fn delay_ms(&self) -> u64;
    fn elapsed_ms(&self) -> u64;
    fn monitors(&self) -> usize;
}

impl<T> View for T
where
    T: Borrow<Event>,
{
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
    #[inline]
    fn as_monitor(&self) -> &str {
        self.borrow().monitor.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn as_cycle(&self) -> &str {
        self.borrow().cycle.map(|c| c.as_str()).unwrap_or("unknown")
    }
    #[inline]
    fn delay_ms(&self) -> u64 {
        self.borrow().delay_ms.unwrap_or(0)
    }
    #[inline]
    fn elapsed_ms(&self) -> u64 {
        self.borrow().elapsed_ms.unwrap_or(0)
    }
    #[inline]
    fn monitors(&self) -> usize {
        self.borrow().monitors.unwrap_or(0)
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // lifecycle
        EventKind::OperatorStarted => "operator started",
        EventKind::StopRequested => "operator stop requested",
        EventKind::OperatorStopped => "operator stopped (worker terminated)",

        // registry
        EventKind::MonitorRegistered => "monitor registered",
        EventKind::MonitorUnregistered => "monitor unregistered",
        EventKind::MonitorRejected => "monitor rejected",

        // cycles
        EventKind::CycleStarted => "cycle started",
        EventKind::CycleFinished => "cycle finished",
        EventKind::CycleFailed => "monitoring cycle failed",
        EventKind::TimerArmed => "next check cycle scheduled",

        // per-monitor outcomes
        EventKind::CheckFailed => "monitor check failed",
        EventKind::AlarmRaised => "monitor raised an alarm",
        EventKind::HeartbeatFailed => "monitor heartbeat not ok",
        EventKind::HeartbeatRejected => "heartbeat request rejected",

        // delivery
        EventKind::TaskRejected => "cycle not queued; worker is stopping",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // lifecycle
        EventKind::OperatorStarted => info!(monitors = e.monitors(), "{msg}"),
        EventKind::StopRequested => info!("{msg}"),
        EventKind::OperatorStopped => info!("{msg}"),

        // registry
        EventKind::MonitorRegistered => debug!(monitor = e.as_monitor(), "{msg}"),
        EventKind::MonitorUnregistered => debug!(monitor = e.as_monitor(), "{msg}"),
        EventKind::MonitorRejected => warn!(reason = e.as_reason(), "{msg}"),

        // cycles
        EventKind::CycleStarted => {
            trace!(cycle = e.as_cycle(), monitors = e.monitors(), "{msg}")
        }
        EventKind::CycleFinished => {
            debug!(cycle = e.as_cycle(), elapsed_ms = e.elapsed_ms(), "{msg}")
        }
        EventKind::CycleFailed => {
            error!(cycle = e.as_cycle(), reason = e.as_reason(), "{msg}")
        }
        EventKind::TimerArmed => trace!(delay_ms = e.delay_ms(), "{msg}"),

        // per-monitor outcomes
        EventKind::CheckFailed => {
            warn!(monitor = e.as_monitor(), reason = e.as_reason(), "{msg}")
        }
        EventKind::AlarmRaised => info!(monitor = e.as_monitor(), "{msg}"),
        EventKind::HeartbeatFailed => {
            warn!(monitor = e.as_monitor(), reason = e.as_reason(), "{msg}")
        }
        EventKind::HeartbeatRejected => debug!(reason = e.as_reason(), "{msg}"),

        // delivery
        EventKind::TaskRejected => {
            debug!(cycle = e.as_cycle(), reason = e.as_reason(), "{msg}")
        }
    }
}
