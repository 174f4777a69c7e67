use std::{fmt, future::Future, pin::Pin};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type Runnable = Box<dyn FnOnce() -> TaskFuture + Send + 'static>;

/// Unit of work executed by a [`Worker`](super::Worker).
///
/// A task pairs a payload with the routine that consumes it:
///
/// ```
/// use meerkat_core::Task;
///
/// let task = Task::new("greet", String::from("world"), |who| async move {
///     println!("hello, {who}");
/// });
/// assert_eq!(task.label(), "greet");
/// ```
pub struct Task {
    label: &'static str,
    run: Runnable,
}

impl Task {
    pub fn new<P, F, Fut>(label: &'static str, payload: P, runnable: F) -> Self
    where
        P: Send + 'static,
        F: FnOnce(P) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            label,
            run: Box::new(move || Box::pin(runnable(payload))),
        }
    }

    /// Short name used in logs.
    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn into_future(self) -> TaskFuture {
        (self.run)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("label", &self.label).finish_non_exhaustive()
    }
}
