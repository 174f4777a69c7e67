use std::time::Duration;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Cadence of periodic check cycles.
    pub interval: Duration,
    /// Upper bound for a single monitor's check or heartbeat.
    pub check_timeout: Duration,
    /// Name of the worker thread.
    pub worker_name: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            check_timeout: Duration::from_secs(10),
            worker_name: "operator-worker".to_string(),
        }
    }
}

impl OperatorConfig {
    #[inline]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[inline]
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    #[inline]
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.interval.is_zero() {
            return Err(CoreError::InvalidConfig("interval must be > 0".into()));
        }
        if self.check_timeout.is_zero() {
            return Err(CoreError::InvalidConfig("check_timeout must be > 0".into()));
        }
        if self.worker_name.trim().is_empty() {
            return Err(CoreError::InvalidConfig("worker_name must not be empty".into()));
        }
        Ok(())
    }
}
