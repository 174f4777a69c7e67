//! Single-consumer task queue drained by one dedicated thread.
//!
//! Tasks run strictly one at a time in FIFO order. The worker thread owns a
//! current-thread tokio runtime, so a task may spawn timers and sub-tasks that
//! live on that same thread until the worker stops.

mod task;
pub use task::Task;

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use tokio::{runtime, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::{error::WorkerError, sync::lock};

type TerminatedFn = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable posting handle to a worker queue.
///
/// Handed to tasks and timers that need to enqueue follow-up work without
/// holding the [`Worker`] itself.
#[derive(Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<Task>,
    shutdown: CancellationToken,
}

impl TaskSender {
    /// Appends a task to the queue.
    ///
    /// Fails with [`WorkerError::Stopped`] once the worker was asked to stop.
    pub fn post(&self, task: Task) -> Result<(), WorkerError> {
        if self.shutdown.is_cancelled() {
            return Err(WorkerError::Stopped);
        }
        trace!(task = task.label(), "task posted");
        self.tx.send(task).map_err(|_| WorkerError::Stopped)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[derive(Default)]
struct Termination {
    done: bool,
    callback: Option<TerminatedFn>,
}

impl Termination {
    /// Marks the worker terminated and runs the callback outside the lock.
    fn fire(slot: &Mutex<Termination>) {
        let callback = {
            let mut t = lock(slot);
            if t.done {
                return;
            }
            t.done = true;
            t.callback.take()
        };
        if let Some(cb) = callback {
            cb();
        }
    }
}

/// Task queue with exactly one consumer thread.
pub struct Worker {
    name: String,
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Task>>>,
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
    termination: Arc<Mutex<Termination>>,
}

impl Worker {
    /// Creates an idle worker; the thread is spawned by [`Worker::start`].
    ///
    /// Tasks posted before `start` are kept and run once the thread is up.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            tx,
            rx: Mutex::new(Some(rx)),
            shutdown: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            termination: Arc::new(Mutex::new(Termination::default())),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the consumer thread is alive.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn sender(&self) -> TaskSender {
        TaskSender {
            tx: self.tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Appends a task to the queue. Non-blocking.
    pub fn post_task(&self, task: Task) -> Result<(), WorkerError> {
        self.sender().post(task)
    }

    /// Registers the callback fired exactly once after the consumer loop has exited.
    ///
    /// Replaces a previously registered callback. If the worker has already
    /// terminated the callback runs immediately on the calling thread.
    pub fn register_on_terminated<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut t = lock(&self.termination);
        if t.done {
            drop(t);
            callback();
            return;
        }
        t.callback = Some(Box::new(callback));
    }

    /// Spawns the consumer thread.
    pub fn start(&self) -> Result<(), WorkerError> {
        if self.shutdown.is_cancelled() {
            return Err(WorkerError::Stopped);
        }
        let rx = lock(&self.rx).take().ok_or(WorkerError::AlreadyStarted)?;

        let name = self.name.clone();
        let shutdown = self.shutdown.clone();
        let running = Arc::clone(&self.running);
        let termination = Arc::clone(&self.termination);

        self.running.store(true, Ordering::SeqCst);
        let spawned = thread::Builder::new().name(self.name.clone()).spawn(move || {
            match runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt.block_on(consume(&name, rx, shutdown)),
                Err(e) => error!(worker = %name, error = %e, "failed to build worker runtime"),
            }
            running.store(false, Ordering::SeqCst);
            debug!(worker = %name, "worker terminated");
            Termination::fire(&termination);
        });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        debug!(worker = %self.name, "worker started");
        Ok(())
    }

    /// Requests the consumer loop to exit after the task currently executing.
    ///
    /// Non-blocking and idempotent. Tasks still queued are discarded. A worker
    /// that was never started terminates immediately.
    pub fn stop(&self) {
        if !self.shutdown.is_cancelled() {
            debug!(worker = %self.name, "worker stop requested");
        }
        self.shutdown.cancel();

        let never_started = lock(&self.rx).take();
        if let Some(mut rx) = never_started {
            let discarded = drain(&mut rx);
            if discarded > 0 {
                debug!(
                    worker = %self.name,
                    discarded,
                    "discarded tasks of a worker that never started"
                );
            }
            Termination::fire(&self.termination);
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn consume(name: &str, mut rx: mpsc::UnboundedReceiver<Task>, shutdown: CancellationToken) {
    debug!(worker = name, "worker loop started");
    loop {
        let task = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = rx.recv() => match next {
                Some(task) => task,
                None => break,
            },
        };

        let label = task.label();
        trace!(worker = name, task = label, "running task");
        // Spawned so a panicking task is contained and the loop keeps draining.
        if let Err(e) = tokio::spawn(task.into_future()).await {
            if e.is_panic() {
                error!(worker = name, task = label, "task panicked");
            } else {
                warn!(worker = name, task = label, "task cancelled");
            }
        }
    }

    let discarded = drain(&mut rx);
    if discarded > 0 {
        debug!(worker = name, discarded, "discarded pending tasks on stop");
    }
    debug!(worker = name, "worker loop exited");
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Task>) -> usize {
    rx.close();
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}
