use serde::{Deserialize, Serialize};

/// Lifecycle state of an operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatorStatus {
    /// No worker thread; nothing is scheduled.
    #[default]
    Stopped,
    /// Cycles are being scheduled.
    Running,
    /// Stop was requested; waiting for the worker thread to exit.
    Stopping,
}

impl OperatorStatus {
    /// Returns `true` until the worker has fully terminated.
    pub fn is_running(&self) -> bool {
        matches!(self, OperatorStatus::Running | OperatorStatus::Stopping)
    }

    /// Returns `true` if new cycles and heartbeat requests are accepted.
    pub fn accepts_work(&self) -> bool {
        matches!(self, OperatorStatus::Running)
    }
}
