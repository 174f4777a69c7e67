use std::sync::{Arc, RwLock};

use meerkat_model::MonitorName;

use crate::{
    monitor::Monitor,
    sync::{read, write},
};

type Entry = (MonitorName, Arc<dyn Monitor>);

/// Name-keyed monitor set preserving insertion order.
///
/// Readers take a [`snapshot`](MonitorRegistry::snapshot) so a cycle iterates
/// a stable copy while registrations keep changing the live set.
#[derive(Default)]
pub struct MonitorRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a monitor under its own name.
    ///
    /// A monitor with the same name is replaced in place and returned.
    pub fn insert(&self, monitor: Arc<dyn Monitor>) -> Option<Arc<dyn Monitor>> {
        let name = monitor.name().to_string();
        let mut entries = write(&self.entries);
        match entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, monitor)),
            None => {
                entries.push((name, monitor));
                None
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Monitor>> {
        let mut entries = write(&self.entries);
        let idx = entries.iter().position(|(n, _)| n == name)?;
        Some(entries.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Monitor>> {
        read(&self.entries)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| Arc::clone(m))
    }

    pub fn names(&self) -> Vec<MonitorName> {
        read(&self.entries).iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        read(&self.entries).clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        read(&self.entries).is_empty()
    }
}
