use std::{fmt, sync::Arc};

use meerkat_model::{MonitorCode, MonitorInfo};
use tracing::{instrument, trace};

use crate::{error::CoreError, monitor::Monitor};

type Ctor = Arc<dyn Fn() -> Arc<dyn Monitor> + Send + Sync>;

struct Entry {
    info: MonitorInfo,
    ctor: Ctor,
}

/// Catalogue of monitor kinds addressable by a short code.
#[derive(Default)]
pub struct MonitorFactory {
    entries: Vec<Entry>,
}

impl MonitorFactory {
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a constructor under `code`; an existing code is replaced.
    pub fn register<F>(&mut self, code: impl Into<MonitorCode>, name: impl Into<String>, ctor: F)
    where
        F: Fn() -> Arc<dyn Monitor> + Send + Sync + 'static,
    {
        let info = MonitorInfo {
            code: code.into(),
            name: name.into(),
        };
        let entry = Entry {
            info,
            ctor: Arc::new(ctor),
        };
        match self.entries.iter_mut().find(|e| e.info.code == entry.info.code) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    #[inline]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.info.code == code)
    }

    /// Builds a fresh monitor instance for `code`.
    #[instrument(level = "trace", skip(self))]
    pub fn create(&self, code: &str) -> Result<Arc<dyn Monitor>, CoreError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.info.code == code)
            .ok_or_else(|| CoreError::UnknownMonitorCode(code.to_string()))?;

        let monitor = (entry.ctor)();
        trace!(monitor = monitor.name(), "factory built monitor");
        Ok(monitor)
    }

    pub fn get_name(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.info.code == code)
            .map(|e| e.info.name.as_str())
    }

    /// Every registered kind, in registration order.
    pub fn get_all_monitor_info(&self) -> Vec<MonitorInfo> {
        self.entries.iter().map(|e| e.info.clone()).collect()
    }
}

impl fmt::Debug for MonitorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.info))
            .finish()
    }
}
