//! Monitor implementations shipped with meerkat.

mod fake;
pub use fake::{FAKE_MONITOR_CODE, FAKE_MONITOR_NAME, FakeMonitor, register_fake_monitor};

use meerkat_core::MonitorFactory;

/// Registers every bundled monitor kind.
pub fn register_all(factory: &mut MonitorFactory) {
    register_fake_monitor(factory);
}
