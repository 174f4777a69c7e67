mod kv;
pub use kv::KeyValue;

mod monitor_settings;
pub use monitor_settings::MonitorSettings;

mod check_result;
pub use check_result::{Alarm, CheckResult};

mod heartbeat;
pub use heartbeat::Heartbeat;

mod analysis;
pub use analysis::Analysis;

mod monitor_info;
pub use monitor_info::MonitorInfo;

mod operator_status;
pub use operator_status::OperatorStatus;

/// Unique registry key of a monitor.
///
/// The operator indexes monitors by this name and prefixes every alarm message with it.
pub type MonitorName = String;

/// Short stable code a monitor kind is registered under in the factory (e.g. `"FMC"`).
pub type MonitorCode = String;
