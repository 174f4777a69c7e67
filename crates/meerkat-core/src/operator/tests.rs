use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
};

use async_trait::async_trait;
use meerkat_model::{CheckResult, Heartbeat};

use super::*;
use crate::error::MonitorError;

const STOP_WAIT: Duration = Duration::from_secs(3);

#[derive(Clone, Copy)]
enum Behavior {
    Clear,
    Alarm,
    Fail,
    NotOk,
    Hang,
    Block,
    Panic,
}

struct Mock {
    name: String,
    behavior: Behavior,
    delay: Duration,
    healthy: bool,
    checks: AtomicUsize,
    completed: AtomicUsize,
    heartbeats: AtomicUsize,
    alarm_on: AtomicBool,
    in_check: AtomicBool,
    overlaps: AtomicUsize,
    mode: Mutex<String>,
}

impl Mock {
    fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            delay: Duration::ZERO,
            healthy: true,
            checks: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            heartbeats: AtomicUsize::new(0),
            alarm_on: AtomicBool::new(true),
            in_check: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            mode: Mutex::new("fast".to_string()),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Monitor for Mock {
    fn name(&self) -> &str {
        &self.name
    }

    async fn do_check(&self) -> Result<CheckResult, MonitorError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.in_check.store(true, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let res = match self.behavior {
            Behavior::Clear => Ok(CheckResult::ok()),
            Behavior::Alarm => Ok(CheckResult::alarm("X")),
            Behavior::Fail => Err(MonitorError::Unavailable("disk gone".into())),
            Behavior::NotOk => Ok(CheckResult::failed()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(CheckResult::ok())
            }
            Behavior::Block => {
                thread::sleep(Duration::from_secs(1));
                Ok(CheckResult::ok())
            }
            Behavior::Panic => panic!("monitor bug"),
        };
        self.in_check.store(false, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        res
    }

    async fn get_heartbeat(&self) -> Result<Heartbeat, MonitorError> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        if self.in_check.load(Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if self.healthy {
            Ok(Heartbeat::healthy("all good"))
        } else {
            Ok(Heartbeat::unhealthy("sensor offline"))
        }
    }

    fn set_alarm(&self, on: bool) {
        self.alarm_on.store(on, Ordering::SeqCst);
    }

    fn get_analysis(&self) -> Option<Analysis> {
        Some(Analysis::new(format!("{} checks", self.checks())))
    }

    fn config_info(&self) -> Option<String> {
        Some("mode can be fast or slow".to_string())
    }

    fn set_config(&self, settings: &MonitorSettings) -> Result<(), MonitorError> {
        match settings.get("mode") {
            Some(mode @ ("fast" | "slow")) => {
                *self.mode.lock().unwrap() = mode.to_string();
                Ok(())
            }
            other => Err(MonitorError::InvalidConfig(format!("bad mode: {other:?}"))),
        }
    }
}

fn operator(interval: Duration) -> Operator {
    Operator::new(OperatorConfig::default().with_interval(interval)).unwrap()
}

fn collect_alarms(op: &Operator) -> Arc<Mutex<Vec<String>>> {
    let alarms = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&alarms);
    op.set_alarm_listener(move |msg| sink.lock().unwrap().push(msg.to_string()));
    alarms
}

fn snapshot(alarms: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    alarms.lock().unwrap().clone()
}

fn stop_and_wait(op: &Operator) {
    op.stop();
    assert!(op.wait_stopped(STOP_WAIT), "operator did not stop in time");
}

#[test]
fn monitor_list_tracks_registrations_in_order() {
    let op = operator(Duration::from_secs(5));
    assert!(op.register_monitor(Arc::new(Mock::new("a", Behavior::Clear))));
    assert!(op.register_monitor(Arc::new(Mock::new("b", Behavior::Clear))));
    assert!(op.register_monitor(Arc::new(Mock::new("c", Behavior::Clear))));
    assert!(op.unregister_monitor("b"));
    assert!(!op.unregister_monitor("b"));
    assert_eq!(op.get_monitor_list(), vec!["a", "c"]);

    op.register_monitor(Arc::new(Mock::new("b", Behavior::Clear)));
    op.register_monitor(Arc::new(Mock::new("a", Behavior::Alarm)));
    assert_eq!(op.get_monitor_list(), vec!["a", "c", "b"]);
}

#[test]
fn blank_monitor_name_is_rejected() {
    let op = operator(Duration::from_secs(5));
    assert!(!op.register_monitor(Arc::new(Mock::new("  ", Behavior::Clear))));
    assert!(op.get_monitor_list().is_empty());
}

#[test]
fn second_start_is_a_no_op() {
    let op = operator(Duration::from_secs(5));
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    op.start().unwrap();
    op.start().unwrap();
    thread::sleep(Duration::from_millis(300));

    assert_eq!(m.checks(), 1);
    assert!(op.is_running());
    stop_and_wait(&op);
}

#[test]
fn periodic_checks_without_alarms() {
    let op = operator(Duration::from_secs(1));
    let alarms = collect_alarms(&op);
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(3_300));
    stop_and_wait(&op);

    let checks = m.checks();
    assert!((2..=4).contains(&checks), "unexpected check count {checks}");
    assert!(snapshot(&alarms).is_empty());
}

#[test]
fn alarm_reported_once_per_cycle() {
    let op = operator(Duration::from_secs(1));
    let alarms = collect_alarms(&op);
    let m = Arc::new(Mock::new("mock-a", Behavior::Alarm));
    op.register_monitor(m.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(2_500));
    stop_and_wait(&op);

    let alarms = snapshot(&alarms);
    assert_eq!(alarms.len(), m.checks());
    assert!(alarms.len() >= 2);
    assert!(alarms.iter().all(|a| a == "mock-a - X"));
}

#[test]
fn failing_check_is_reported_and_monitoring_continues() {
    let op = operator(Duration::from_millis(300));
    let alarms = collect_alarms(&op);
    let m = Arc::new(Mock::new("mock-f", Behavior::Fail));
    op.register_monitor(m.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(800));
    stop_and_wait(&op);

    assert!(m.checks() >= 2);
    let alarms = snapshot(&alarms);
    assert!(
        alarms
            .iter()
            .all(|a| a == "mock-f - check failed: source unavailable: disk gone")
    );
    assert_eq!(alarms.len(), m.checks());
}

#[test]
fn not_ok_result_is_a_failure() {
    let op = operator(Duration::from_secs(5));
    let alarms = collect_alarms(&op);
    op.register_monitor(Arc::new(Mock::new("mock-n", Behavior::NotOk)));

    op.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    stop_and_wait(&op);

    assert_eq!(
        snapshot(&alarms),
        vec!["mock-n - check failed: monitor reported not ok"]
    );
}

#[test]
fn stop_halts_further_checks() {
    let op = operator(Duration::from_millis(200));
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(500));
    stop_and_wait(&op);

    let after_stop = m.checks();
    thread::sleep(Duration::from_millis(600));
    assert_eq!(m.checks(), after_stop);
    assert!(!op.is_running());
    assert_eq!(op.status(), OperatorStatus::Stopped);
}

#[test]
fn operator_can_restart_after_stop() {
    let op = operator(Duration::from_secs(5));
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(200));
    stop_and_wait(&op);

    op.start().unwrap();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(m.checks(), 2);
    stop_and_wait(&op);
}

#[test]
fn heartbeat_while_stopped_is_rejected() {
    let op = operator(Duration::from_secs(5));
    let alarms = collect_alarms(&op);
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    op.get_heartbeat();

    assert_eq!(
        snapshot(&alarms),
        vec!["heartbeat rejected: operator is not running"]
    );
    assert_eq!(m.heartbeats.load(Ordering::SeqCst), 0);
}

#[test]
fn heartbeat_without_monitors_is_rejected() {
    let op = operator(Duration::from_secs(5));
    let alarms = collect_alarms(&op);

    op.start().unwrap();
    op.get_heartbeat();
    stop_and_wait(&op);

    assert_eq!(
        snapshot(&alarms),
        vec!["heartbeat rejected: no monitors registered"]
    );
}

#[test]
fn heartbeat_reports_only_unhealthy_monitors() {
    let op = operator(Duration::from_secs(5));
    let alarms = collect_alarms(&op);
    let good = Arc::new(Mock::new("good", Behavior::Clear));
    let bad = Arc::new(Mock::new("bad", Behavior::Clear).unhealthy());
    op.register_monitor(good.clone());
    op.register_monitor(bad.clone());

    op.start().unwrap();
    op.get_heartbeat();
    thread::sleep(Duration::from_millis(300));
    stop_and_wait(&op);

    assert_eq!(snapshot(&alarms), vec!["bad - sensor offline"]);
    assert_eq!(good.heartbeats.load(Ordering::SeqCst), 1);
    assert_eq!(bad.heartbeats.load(Ordering::SeqCst), 1);
}

#[test]
fn checks_of_one_cycle_run_concurrently() {
    let op = operator(Duration::from_secs(5));
    let a = Arc::new(Mock::new("a", Behavior::Clear).delayed(Duration::from_millis(500)));
    let b = Arc::new(Mock::new("b", Behavior::Clear).delayed(Duration::from_millis(500)));
    op.register_monitor(a.clone());
    op.register_monitor(b.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(800));

    assert_eq!(a.completed.load(Ordering::SeqCst), 1);
    assert_eq!(b.completed.load(Ordering::SeqCst), 1);
    stop_and_wait(&op);
}

#[test]
fn hung_check_times_out_and_next_cycle_runs() {
    let cfg = OperatorConfig::default()
        .with_interval(Duration::from_millis(300))
        .with_check_timeout(Duration::from_millis(200));
    let op = Operator::new(cfg).unwrap();
    let alarms = collect_alarms(&op);
    let hung = Arc::new(Mock::new("hung", Behavior::Hang));
    let fine = Arc::new(Mock::new("fine", Behavior::Clear));
    op.register_monitor(hung.clone());
    op.register_monitor(fine.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(1_000));
    stop_and_wait(&op);

    assert!(hung.checks() >= 2);
    assert!(fine.checks() >= 2);
    let alarms = snapshot(&alarms);
    assert!(!alarms.is_empty());
    assert!(
        alarms
            .iter()
            .all(|a| a == "hung - check failed: timed out after 200ms")
    );
}

#[test]
fn panicking_check_is_isolated() {
    let op = operator(Duration::from_secs(5));
    let alarms = collect_alarms(&op);
    let fine = Arc::new(Mock::new("fine", Behavior::Alarm));
    op.register_monitor(Arc::new(Mock::new("boom", Behavior::Panic)));
    op.register_monitor(fine.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    stop_and_wait(&op);

    let mut alarms = snapshot(&alarms);
    alarms.sort();
    assert_eq!(alarms, vec!["boom - check failed: panicked", "fine - X"]);
}

fn collect_exceptions(op: &Operator) -> Arc<Mutex<Vec<String>>> {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    op.set_exception_listener(move |msg| sink.lock().unwrap().push(msg.to_string()));
    failures
}

#[test]
fn panicking_alarm_listener_does_not_stop_monitoring() {
    let op = operator(Duration::from_millis(300));
    let m = Arc::new(Mock::new("mock", Behavior::Alarm));
    op.register_monitor(m.clone());
    op.set_alarm_listener(|_| panic!("listener exploded"));
    let failures = collect_exceptions(&op);

    op.start().unwrap();
    thread::sleep(Duration::from_millis(800));
    stop_and_wait(&op);

    assert!(m.checks() >= 2, "monitoring stopped after a listener panic");
    let failures = snapshot(&failures);
    assert!(!failures.is_empty());
    assert!(
        failures
            .iter()
            .all(|f| f == "alarm listener panicked: listener exploded")
    );
}

#[test]
fn listener_panic_does_not_lose_other_monitors_alarms() {
    let op = operator(Duration::from_secs(5));
    let fast = Arc::new(Mock::new("fast", Behavior::Alarm));
    let slow = Arc::new(Mock::new("slow", Behavior::Alarm).delayed(Duration::from_millis(300)));
    op.register_monitor(fast.clone());
    op.register_monitor(slow.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    op.set_alarm_listener(move |msg| {
        sink.lock().unwrap().push(msg.to_string());
        if msg.starts_with("fast") {
            panic!("cannot page for fast");
        }
    });
    let failures = collect_exceptions(&op);

    op.start().unwrap();
    thread::sleep(Duration::from_millis(700));
    stop_and_wait(&op);

    let mut seen = snapshot(&seen);
    seen.sort();
    assert_eq!(seen, vec!["fast - X", "slow - X"]);
    assert_eq!(slow.completed.load(Ordering::SeqCst), 1);
    assert_eq!(
        snapshot(&failures),
        vec!["alarm listener panicked: cannot page for fast"]
    );
}

#[test]
fn blocking_check_times_out_without_stalling_siblings() {
    let cfg = OperatorConfig::default()
        .with_interval(Duration::from_secs(5))
        .with_check_timeout(Duration::from_millis(100));
    let op = Operator::new(cfg).unwrap();
    let alarms = collect_alarms(&op);
    let blocked = Arc::new(Mock::new("blocked", Behavior::Block));
    let fine = Arc::new(Mock::new("fine", Behavior::Alarm).delayed(Duration::from_millis(50)));
    op.register_monitor(blocked.clone());
    op.register_monitor(fine.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(500));

    let mut early = snapshot(&alarms);
    early.sort();
    assert_eq!(
        early,
        vec!["blocked - check failed: timed out after 100ms", "fine - X"]
    );
    assert_eq!(blocked.completed.load(Ordering::SeqCst), 0);

    stop_and_wait(&op);
    assert_eq!(blocked.completed.load(Ordering::SeqCst), 1);
}

#[test]
fn heartbeat_waits_for_the_running_check_cycle() {
    let op = operator(Duration::from_secs(5));
    let alarms = collect_alarms(&op);
    let m = Arc::new(Mock::new("mock", Behavior::Clear).delayed(Duration::from_millis(400)));
    op.register_monitor(m.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(m.in_check.load(Ordering::SeqCst));
    op.get_heartbeat();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(m.heartbeats.load(Ordering::SeqCst), 0);

    thread::sleep(Duration::from_millis(500));
    stop_and_wait(&op);

    assert_eq!(m.heartbeats.load(Ordering::SeqCst), 1);
    assert_eq!(m.overlaps.load(Ordering::SeqCst), 0);
    assert!(snapshot(&alarms).is_empty());
}

#[test]
fn registration_mid_run_applies_to_next_cycle() {
    let op = operator(Duration::from_millis(300));
    let a = Arc::new(Mock::new("a", Behavior::Clear));
    let b = Arc::new(Mock::new("b", Behavior::Clear));
    op.register_monitor(a.clone());

    op.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(b.checks(), 0);
    op.register_monitor(b.clone());
    thread::sleep(Duration::from_millis(500));
    stop_and_wait(&op);

    assert!(b.checks() >= 1);
    assert!(a.checks() > b.checks());
}

#[test]
fn alarm_toggle_and_analysis_delegate_to_monitor() {
    let op = operator(Duration::from_secs(5));
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    assert!(op.set_alarm("mock", false));
    assert!(!m.alarm_on.load(Ordering::SeqCst));
    assert!(!op.set_alarm("missing", true));

    assert_eq!(op.get_analysis_result("mock").unwrap().message, "0 checks");
    assert!(op.get_analysis_result("missing").is_none());
}

#[test]
fn config_surface_delegates_to_monitor() {
    let op = operator(Duration::from_secs(5));
    let m = Arc::new(Mock::new("mock", Behavior::Clear));
    op.register_monitor(m.clone());

    assert_eq!(
        op.get_config_info("mock").as_deref(),
        Some("mode can be fast or slow")
    );
    assert!(op.get_config_info("missing").is_none());

    op.set_config("mock", &MonitorSettings::single("mode", "slow"))
        .unwrap();
    assert_eq!(*m.mode.lock().unwrap(), "slow");

    let err = op
        .set_config("mock", &MonitorSettings::single("mode", "turbo"))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Monitor(MonitorError::InvalidConfig(_))
    ));

    let err = op
        .set_config("missing", &MonitorSettings::new())
        .unwrap_err();
    assert!(matches!(err, CoreError::MonitorNotFound(name) if name == "missing"));
}

#[test]
fn interval_is_validated_and_updated() {
    let op = operator(Duration::from_secs(5));
    assert!(op.set_interval(Duration::ZERO).is_err());
    op.set_interval(Duration::from_secs(2)).unwrap();
    assert_eq!(op.interval(), Duration::from_secs(2));
}

#[test]
fn invalid_config_is_rejected_at_build() {
    let cfg = OperatorConfig::default().with_check_timeout(Duration::ZERO);
    assert!(matches!(
        Operator::new(cfg),
        Err(CoreError::InvalidConfig(_))
    ));
}

struct Recorder(Mutex<Vec<EventKind>>);

impl Subscribe for Recorder {
    fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.kind);
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[test]
fn lifecycle_events_reach_subscribers() {
    let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
    let op = Operator::builder(OperatorConfig::default())
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();
    op.set_alarm_listener(|_| {});
    op.register_monitor(Arc::new(Mock::new("mock", Behavior::Alarm)));

    op.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    stop_and_wait(&op);

    let kinds = rec.0.lock().unwrap().clone();
    for expected in [
        EventKind::MonitorRegistered,
        EventKind::OperatorStarted,
        EventKind::CycleStarted,
        EventKind::AlarmRaised,
        EventKind::TimerArmed,
        EventKind::CycleFinished,
        EventKind::StopRequested,
        EventKind::OperatorStopped,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
}
