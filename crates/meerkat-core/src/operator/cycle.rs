use std::{any::Any, future::Future, time::Duration};

use meerkat_model::{CheckResult, Heartbeat};
use tokio::{runtime::Handle, task::JoinError, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::MonitorError,
    event::{CycleKind, duration_ms},
};

/// Result of running one monitor call under the per-check timeout.
pub(super) enum Guarded<T> {
    Completed(T),
    TimedOut,
    Panicked,
    Cancelled,
}

/// A monitor call running on the blocking pool.
///
/// The call is driven by the worker runtime through [`Handle::block_on`], so a
/// monitor that blocks its thread only occupies one pool thread while timers
/// and sibling calls keep running. Dropping the handle cancels the call at its
/// next await point.
pub(super) struct Call<T> {
    handle: JoinHandle<Option<T>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> Call<T> {
    fn launch<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let rt = Handle::current();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            rt.block_on(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    value = fut => Some(value),
                }
            })
        });
        Self { handle, cancel }
    }
}

impl<T> Call<T> {
    /// Waits for a cancelled call to actually return.
    pub(super) async fn join(mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl<T> Drop for Call<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Runs `fut` bounded by `timeout`.
///
/// On timeout the call is cancelled and handed back, so the cycle can report
/// the failure at once and join the call before it ends.
pub(super) async fn guarded<T, F>(timeout: Duration, fut: F) -> (Guarded<T>, Option<Call<T>>)
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut call = Call::launch(fut);
    let waited = tokio::time::timeout(timeout, &mut call.handle).await;
    match waited {
        Ok(Ok(Some(value))) => (Guarded::Completed(value), None),
        Ok(Ok(None)) => (Guarded::Cancelled, None),
        Ok(Err(e)) if e.is_panic() => (Guarded::Panicked, None),
        Ok(Err(_)) => (Guarded::Cancelled, None),
        Err(_) => {
            call.cancel.cancel();
            (Guarded::TimedOut, Some(call))
        }
    }
}

pub(super) enum CheckOutcome {
    Clear,
    Alarm(String),
    Failed(String),
}

impl CheckOutcome {
    pub(super) fn from_guarded(
        res: Guarded<Result<CheckResult, MonitorError>>,
        timeout: Duration,
    ) -> Self {
        match res {
            Guarded::Completed(Ok(r)) if !r.ok => Self::Failed("monitor reported not ok".into()),
            Guarded::Completed(Ok(r)) => match r.alarm_message() {
                Some(msg) => Self::Alarm(msg.to_string()),
                None => Self::Clear,
            },
            Guarded::Completed(Err(e)) => Self::Failed(e.to_string()),
            other => Self::Failed(abnormal(&other, timeout)),
        }
    }
}

pub(super) enum HeartbeatOutcome {
    Healthy(String),
    Unhealthy(String),
    Failed(String),
}

impl HeartbeatOutcome {
    pub(super) fn from_guarded(
        res: Guarded<Result<Heartbeat, MonitorError>>,
        timeout: Duration,
    ) -> Self {
        match res {
            Guarded::Completed(Ok(hb)) if hb.ok => Self::Healthy(hb.message),
            Guarded::Completed(Ok(hb)) => Self::Unhealthy(hb.message),
            Guarded::Completed(Err(e)) => Self::Failed(e.to_string()),
            other => Self::Failed(abnormal(&other, timeout)),
        }
    }
}

fn abnormal<T>(res: &Guarded<T>, timeout: Duration) -> String {
    match res {
        Guarded::TimedOut => format!("timed out after {}ms", duration_ms(timeout)),
        Guarded::Panicked => "panicked".to_string(),
        Guarded::Cancelled | Guarded::Completed(_) => "cancelled".to_string(),
    }
}

/// Human-readable reason of a failed cycle task.
pub(super) fn join_failure(e: JoinError) -> String {
    if !e.is_panic() {
        return "cancelled".to_string();
    }
    match panic_text(&*e.into_panic()) {
        Some(msg) => format!("panicked: {msg}"),
        None => "panicked".to_string(),
    }
}

/// Message carried by a panic payload, if it is a string.
pub(super) fn panic_text(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

#[inline]
pub(super) fn task_label(kind: CycleKind) -> &'static str {
    match kind {
        CycleKind::Check => "check-cycle",
        CycleKind::Heartbeat => "heartbeat-cycle",
    }
}
