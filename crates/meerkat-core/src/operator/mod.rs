//! Periodic, concurrent, fault-isolated monitoring over a monitor registry.
//!
//! All cycles of one run are serialized through a dedicated [`Worker`]. Inside a
//! cycle every monitor is checked concurrently, each bounded by the check
//! timeout, and results are reported to the alarm listener as they complete.
//! Once every check has finished the next periodic cycle is armed with a
//! drift-corrected delay.

mod config;
mod cycle;

pub use config::OperatorConfig;

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Condvar, Mutex, PoisonError, RwLock, Weak},
    time::{Duration, Instant},
};

use meerkat_model::{Analysis, MonitorName, MonitorSettings, OperatorStatus};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    error::CoreError,
    event::{Bus, CycleKind, Event, EventKind, Subscribe},
    monitor::Monitor,
    registry::MonitorRegistry,
    sync::{lock, read, write},
    timer::DriftTimer,
    worker::{Task, TaskSender, Worker},
};
use cycle::{Call, CheckOutcome, HeartbeatOutcome, guarded, join_failure, panic_text, task_label};

/// Receives alarm and per-monitor failure messages.
pub type AlarmListener = Arc<dyn Fn(&str) + Send + Sync>;
/// Receives cycle-level failure messages.
pub type ExceptionListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle to one run's worker queue and cancellation scope.
#[derive(Clone)]
struct RunContext {
    sender: TaskSender,
    cancel: CancellationToken,
}

#[derive(Default)]
struct RunState {
    status: OperatorStatus,
    worker: Option<Worker>,
    ctx: Option<RunContext>,
}

struct Inner {
    worker_name: String,
    check_timeout: Duration,
    registry: MonitorRegistry,
    alarm_listener: RwLock<Option<AlarmListener>>,
    exception_listener: RwLock<Option<ExceptionListener>>,
    timer: Mutex<DriftTimer>,
    run: Mutex<RunState>,
    stopped: Condvar,
    bus: Bus,
}

/// Scheduler and orchestrator of monitors.
///
/// Cheap to clone; all clones drive the same registry and run. The API is
/// synchronous and may be called from any thread, inside or outside a tokio
/// runtime.
#[derive(Clone)]
pub struct Operator {
    inner: Arc<Inner>,
}

pub struct OperatorBuilder {
    config: OperatorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OperatorBuilder {
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn build(self) -> Result<Operator, CoreError> {
        self.config.validate()?;
        let OperatorConfig {
            interval,
            check_timeout,
            worker_name,
        } = self.config;

        let inner = Inner {
            worker_name,
            check_timeout,
            registry: MonitorRegistry::new(),
            alarm_listener: RwLock::new(None),
            exception_listener: RwLock::new(None),
            timer: Mutex::new(DriftTimer::new(interval)),
            run: Mutex::new(RunState::default()),
            stopped: Condvar::new(),
            bus: Bus::new(self.subscribers),
        };
        Ok(Operator {
            inner: Arc::new(inner),
        })
    }
}

impl Operator {
    pub fn new(config: OperatorConfig) -> Result<Self, CoreError> {
        Self::builder(config).build()
    }

    pub fn builder(config: OperatorConfig) -> OperatorBuilder {
        OperatorBuilder {
            config,
            subscribers: Vec::new(),
        }
    }

    // ---- registry ----

    /// Adds a monitor keyed by its name; a monitor with the same name is replaced.
    ///
    /// Returns `false` and leaves the registry untouched when the name is blank.
    pub fn register_monitor(&self, monitor: Arc<dyn Monitor>) -> bool {
        let name = monitor.name().to_string();
        if name.trim().is_empty() {
            warn!("monitor rejected: empty name");
            self.inner
                .bus
                .publish(Event::new(EventKind::MonitorRejected).with_reason("empty name"));
            return false;
        }

        let replaced = self.inner.registry.insert(monitor).is_some();
        debug!(monitor = %name, replaced, "monitor registered");
        self.inner
            .bus
            .publish(Event::new(EventKind::MonitorRegistered).with_monitor(name));
        true
    }

    pub fn unregister_monitor(&self, name: &str) -> bool {
        let removed = self.inner.registry.remove(name).is_some();
        if removed {
            debug!(monitor = name, "monitor unregistered");
            self.inner
                .bus
                .publish(Event::new(EventKind::MonitorUnregistered).with_monitor(name));
        }
        removed
    }

    /// Registered names in insertion order.
    pub fn get_monitor_list(&self) -> Vec<MonitorName> {
        self.inner.registry.names()
    }

    // ---- listeners ----

    pub fn set_alarm_listener<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *write(&self.inner.alarm_listener) = Some(Arc::new(listener));
    }

    pub fn set_exception_listener<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *write(&self.inner.exception_listener) = Some(Arc::new(listener));
    }

    // ---- lifecycle ----

    /// Spawns a fresh worker and posts the first check cycle immediately.
    ///
    /// No-op while a run is active (including while it is stopping).
    pub fn start(&self) -> Result<(), CoreError> {
        let mut run = lock(&self.inner.run);
        if run.status.is_running() {
            debug!(status = ?run.status, "operator already running; start ignored");
            return Ok(());
        }

        let worker = Worker::new(self.inner.worker_name.clone());
        let weak = Arc::downgrade(&self.inner);
        worker.register_on_terminated(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_worker_terminated();
            }
        });

        let ctx = RunContext {
            sender: worker.sender(),
            cancel: CancellationToken::new(),
        };
        lock(&self.inner.timer).reset();
        worker.start()?;

        run.status = OperatorStatus::Running;
        run.worker = Some(worker);
        run.ctx = Some(ctx.clone());
        drop(run);

        let monitors = self.inner.registry.len();
        info!(
            interval_ms = self.interval().as_millis() as u64,
            monitors, "operator started"
        );
        self.inner
            .bus
            .publish(Event::new(EventKind::OperatorStarted).with_monitors(monitors));

        self.inner.post_cycle(CycleKind::Check, &ctx);
        Ok(())
    }

    /// Cancels the armed timer and asks the worker to exit.
    ///
    /// Non-blocking: an in-flight cycle finishes naturally, queued cycles are
    /// discarded. Use [`Operator::wait_stopped`] to wait for the worker.
    pub fn stop(&self) {
        let mut run = lock(&self.inner.run);
        if run.status != OperatorStatus::Running {
            debug!(status = ?run.status, "operator not running; stop ignored");
            return;
        }
        run.status = OperatorStatus::Stopping;
        if let Some(ctx) = &run.ctx {
            ctx.cancel.cancel();
        }
        if let Some(worker) = &run.worker {
            worker.stop();
        }
        drop(run);

        info!("operator stop requested");
        self.inner.bus.publish(Event::new(EventKind::StopRequested));
    }

    /// Blocks the calling thread until the run has fully stopped.
    ///
    /// Returns `false` if `timeout` elapsed first. Must not be called from an
    /// alarm listener, which runs on the worker thread.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        let run = lock(&self.inner.run);
        let (run, _) = self
            .inner
            .stopped
            .wait_timeout_while(run, timeout, |r| r.status != OperatorStatus::Stopped)
            .unwrap_or_else(PoisonError::into_inner);
        run.status == OperatorStatus::Stopped
    }

    #[inline]
    pub fn status(&self) -> OperatorStatus {
        lock(&self.inner.run).status
    }

    /// `true` from `start` until the worker has terminated.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    pub fn interval(&self) -> Duration {
        lock(&self.inner.timer).interval()
    }

    /// Changes the polling cadence; a timer that is already armed keeps its delay.
    pub fn set_interval(&self, interval: Duration) -> Result<(), CoreError> {
        if interval.is_zero() {
            return Err(CoreError::InvalidConfig("interval must be > 0".into()));
        }
        lock(&self.inner.timer).set_interval(interval);
        debug!(interval_ms = interval.as_millis() as u64, "interval updated");
        Ok(())
    }

    // ---- on-demand ----

    /// Requests a heartbeat from every monitor.
    ///
    /// Fire-and-forget: unhealthy results and rejections arrive through the
    /// alarm listener.
    pub fn get_heartbeat(&self) {
        let ctx = {
            let run = lock(&self.inner.run);
            if run.status.accepts_work() {
                run.ctx.clone()
            } else {
                None
            }
        };

        let Some(ctx) = ctx else {
            self.inner.reject_heartbeat("operator is not running");
            return;
        };
        if self.inner.registry.is_empty() {
            self.inner.reject_heartbeat("no monitors registered");
            return;
        }
        self.inner.post_cycle(CycleKind::Heartbeat, &ctx);
    }

    /// Returns `false` when no monitor has that name.
    pub fn set_alarm(&self, name: &str, on: bool) -> bool {
        match self.inner.registry.get(name) {
            Some(monitor) => {
                monitor.set_alarm(on);
                debug!(monitor = name, on, "alarm toggled");
                true
            }
            None => {
                debug!(monitor = name, "set_alarm for unknown monitor ignored");
                false
            }
        }
    }

    pub fn get_analysis_result(&self, name: &str) -> Option<Analysis> {
        self.inner.registry.get(name)?.get_analysis()
    }

    pub fn get_config_info(&self, name: &str) -> Option<String> {
        self.inner.registry.get(name)?.config_info()
    }

    #[instrument(level = "debug", skip(self, settings), fields(keys = settings.len()))]
    pub fn set_config(&self, name: &str, settings: &MonitorSettings) -> Result<(), CoreError> {
        let monitor = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| CoreError::MonitorNotFound(name.to_string()))?;
        monitor.set_config(settings)?;
        debug!("monitor settings applied");
        Ok(())
    }
}

impl Inner {
    fn on_worker_terminated(&self) {
        {
            let mut run = lock(&self.run);
            run.status = OperatorStatus::Stopped;
            run.worker = None;
            run.ctx = None;
        }
        info!("operator stopped");
        self.bus.publish(Event::new(EventKind::OperatorStopped));
        self.stopped.notify_all();
    }

    fn post_cycle(self: &Arc<Self>, kind: CycleKind, ctx: &RunContext) {
        let payload = (Arc::downgrade(self), ctx.clone());
        let task = Task::new(
            task_label(kind),
            payload,
            move |(weak, ctx): (Weak<Inner>, RunContext)| async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                match kind {
                    CycleKind::Check => inner.run_check_cycle(ctx).await,
                    CycleKind::Heartbeat => inner.run_heartbeat_cycle(ctx).await,
                }
            },
        );

        if let Err(e) = ctx.sender.post(task) {
            debug!(cycle = kind.as_str(), error = %e, "cycle not posted");
            self.bus.publish(
                Event::new(EventKind::TaskRejected)
                    .with_cycle(kind)
                    .with_reason(e.to_string()),
            );
        }
    }

    async fn run_check_cycle(self: Arc<Self>, ctx: RunContext) {
        if ctx.cancel.is_cancelled() {
            return;
        }
        let monitors = self.registry.snapshot();
        let started = Instant::now();
        trace!(monitors = monitors.len(), "check cycle started");
        self.bus.publish(
            Event::new(EventKind::CycleStarted)
                .with_cycle(CycleKind::Check)
                .with_monitors(monitors.len()),
        );

        let outcome = tokio::spawn(Arc::clone(&self).check_all(monitors)).await;
        // Armed before reporting, so a failing exception listener cannot end monitoring.
        self.arm_timer(&ctx);

        match outcome {
            Ok(()) => self.finish_cycle(CycleKind::Check, started),
            Err(e) => self.fail_cycle(CycleKind::Check, join_failure(e)),
        }
    }

    async fn run_heartbeat_cycle(self: Arc<Self>, ctx: RunContext) {
        if ctx.cancel.is_cancelled() {
            return;
        }
        let monitors = self.registry.snapshot();
        if monitors.is_empty() {
            debug!("heartbeat skipped: registry emptied before the cycle ran");
            return;
        }
        let started = Instant::now();
        self.bus.publish(
            Event::new(EventKind::CycleStarted)
                .with_cycle(CycleKind::Heartbeat)
                .with_monitors(monitors.len()),
        );

        match tokio::spawn(Arc::clone(&self).heartbeat_all(monitors)).await {
            Ok(()) => self.finish_cycle(CycleKind::Heartbeat, started),
            Err(e) => self.fail_cycle(CycleKind::Heartbeat, join_failure(e)),
        }
    }

    async fn check_all(self: Arc<Self>, monitors: Vec<(MonitorName, Arc<dyn Monitor>)>) {
        let timeout = self.check_timeout;
        let mut set = JoinSet::new();
        for (name, monitor) in monitors {
            set.spawn(async move {
                let (res, left) = guarded(timeout, async move { monitor.do_check().await }).await;
                (name, res, left)
            });
        }

        let mut stragglers = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (name, res, left) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "check task lost");
                    continue;
                }
            };
            stragglers.extend(left);
            match CheckOutcome::from_guarded(res, timeout) {
                CheckOutcome::Clear => trace!(monitor = %name, "check clear"),
                CheckOutcome::Alarm(message) => {
                    debug!(monitor = %name, alarm = %message, "alarm raised");
                    self.bus
                        .publish(Event::new(EventKind::AlarmRaised).with_monitor(name.as_str()));
                    self.notify_alarm(&format!("{name} - {message}"));
                }
                CheckOutcome::Failed(reason) => {
                    warn!(monitor = %name, %reason, "check failed");
                    self.bus.publish(
                        Event::new(EventKind::CheckFailed)
                            .with_monitor(name.as_str())
                            .with_reason(reason.as_str()),
                    );
                    self.notify_alarm(&format!("{name} - check failed: {reason}"));
                }
            }
        }
        join_stragglers(CycleKind::Check, stragglers).await;
    }

    async fn heartbeat_all(self: Arc<Self>, monitors: Vec<(MonitorName, Arc<dyn Monitor>)>) {
        let timeout = self.check_timeout;
        let mut set = JoinSet::new();
        for (name, monitor) in monitors {
            set.spawn(async move {
                let (res, left) =
                    guarded(timeout, async move { monitor.get_heartbeat().await }).await;
                (name, res, left)
            });
        }

        let mut stragglers = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (name, res, left) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "heartbeat task lost");
                    continue;
                }
            };
            stragglers.extend(left);
            let message = match HeartbeatOutcome::from_guarded(res, timeout) {
                HeartbeatOutcome::Healthy(message) => {
                    trace!(monitor = %name, detail = %message, "heartbeat ok");
                    continue;
                }
                HeartbeatOutcome::Unhealthy(message) => format!("{name} - {message}"),
                HeartbeatOutcome::Failed(reason) => format!("{name} - heartbeat failed: {reason}"),
            };
            warn!(monitor = %name, detail = %message, "heartbeat not ok");
            self.bus.publish(
                Event::new(EventKind::HeartbeatFailed)
                    .with_monitor(name.as_str())
                    .with_reason(message.as_str()),
            );
            self.notify_alarm(&message);
        }
        join_stragglers(CycleKind::Heartbeat, stragglers).await;
    }

    /// Arms the one-shot timer that posts the next check cycle.
    fn arm_timer(self: &Arc<Self>, ctx: &RunContext) {
        if ctx.cancel.is_cancelled() {
            return;
        }
        let delay = lock(&self.timer).next_delay(Instant::now());
        trace!(delay_ms = delay.as_millis() as u64, "timer armed");
        self.bus
            .publish(Event::new(EventKind::TimerArmed).with_delay(delay));

        let weak = Arc::downgrade(self);
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = ctx.cancel.cancelled() => trace!("timer cancelled"),
                _ = tokio::time::sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        lock(&inner.timer).record_fire(Instant::now());
                        inner.post_cycle(CycleKind::Check, &ctx);
                    }
                }
            }
        });
    }

    fn finish_cycle(&self, kind: CycleKind, started: Instant) {
        let elapsed = started.elapsed();
        trace!(cycle = kind.as_str(), elapsed_ms = elapsed.as_millis() as u64, "cycle finished");
        self.bus.publish(
            Event::new(EventKind::CycleFinished)
                .with_cycle(kind)
                .with_elapsed(elapsed),
        );
    }

    fn fail_cycle(&self, kind: CycleKind, reason: String) {
        error!(cycle = kind.as_str(), %reason, "monitoring cycle failed");
        self.bus.publish(
            Event::new(EventKind::CycleFailed)
                .with_cycle(kind)
                .with_reason(reason.as_str()),
        );

        self.notify_exception(&format!("monitoring cycle failed: {reason}"));
    }

    fn reject_heartbeat(&self, reason: &str) {
        debug!(reason, "heartbeat rejected");
        self.bus
            .publish(Event::new(EventKind::HeartbeatRejected).with_reason(reason));
        self.notify_alarm(&format!("heartbeat rejected: {reason}"));
    }

    /// Delivers `message` to the alarm listener; a panicking listener is
    /// reported to the exception listener and the cycle carries on.
    fn notify_alarm(&self, message: &str) {
        let Some(listener) = read(&self.alarm_listener).clone() else {
            warn!(alarm = message, "alarm dropped: no listener set");
            return;
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(message))) {
            let cause = panic_text(&*payload).unwrap_or("unknown panic").to_string();
            error!(alarm = message, %cause, "alarm listener panicked");
            self.notify_exception(&format!("alarm listener panicked: {cause}"));
        }
    }

    fn notify_exception(&self, message: &str) {
        let Some(listener) = read(&self.exception_listener).clone() else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
            error!(detail = message, "exception listener panicked");
        }
    }
}

/// Waits for timed-out calls so none of them outlives its cycle.
async fn join_stragglers<T>(kind: CycleKind, calls: Vec<Call<T>>) {
    if calls.is_empty() {
        return;
    }
    debug!(cycle = kind.as_str(), calls = calls.len(), "joining timed-out calls");
    for call in calls {
        call.join().await;
    }
}

#[cfg(test)]
mod tests;
