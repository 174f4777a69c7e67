use async_trait::async_trait;
use meerkat_model::{Analysis, CheckResult, Heartbeat, MonitorSettings};

use crate::error::MonitorError;

/// A monitored source.
///
/// The operator runs checks and heartbeats of different monitors concurrently,
/// and may call the synchronous methods from any thread while a check is in
/// flight, so implementations keep their mutable state behind interior
/// mutability.
///
/// A monitor should return from `do_check` within the operator's check timeout.
/// A call that overruns it is reported as timed out when the timeout elapses and
/// is cancelled at its next await point. Calls run on their own blocking-pool
/// threads, so a monitor that blocks its thread does not hold up the timeout or
/// its siblings, but the cycle still waits for the blocked call to return
/// before it ends.
#[async_trait]
pub trait Monitor: Send + Sync + 'static {
    /// Registry key and prefix of every message this monitor produces.
    fn name(&self) -> &str;

    /// Performs one observation.
    async fn do_check(&self) -> Result<CheckResult, MonitorError>;

    /// Reports the monitor's own health.
    async fn get_heartbeat(&self) -> Result<Heartbeat, MonitorError>;

    /// Enables or disables alarm generation for subsequent checks.
    fn set_alarm(&self, on: bool);

    /// Most recent analysis, `None` before the first check.
    fn get_analysis(&self) -> Option<Analysis>;

    /// Human-readable description of accepted settings.
    fn config_info(&self) -> Option<String> {
        None
    }

    /// Applies runtime settings.
    fn set_config(&self, _settings: &MonitorSettings) -> Result<(), MonitorError> {
        Err(MonitorError::InvalidConfig(format!(
            "monitor '{}' accepts no settings",
            self.name()
        )))
    }
}
