use thiserror::Error;

/// Errors returned by a monitor's own operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("check failed: {0}")]
    CheckFailed(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors of the task queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker already started")]
    AlreadyStarted,
    #[error("worker is stopped; task rejected")]
    Stopped,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

impl From<std::io::Error> for WorkerError {
    fn from(e: std::io::Error) -> Self {
        WorkerError::Spawn(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
    #[error("monitor not registered: {0}")]
    MonitorNotFound(String),
    #[error("no monitor kind registered for code: {0}")]
    UnknownMonitorCode(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
