use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::error;

use super::{Event, Subscribe};

/// Fans events out to every subscriber; a panicking subscriber is isolated.
#[derive(Default, Clone)]
pub(crate) struct Bus {
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Bus {
    pub(crate) fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subscribers }
    }

    pub(crate) fn publish(&self, event: Event) {
        for sub in &self.subscribers {
            if catch_unwind(AssertUnwindSafe(|| sub.on_event(&event))).is_err() {
                error!(
                    subscriber = sub.name(),
                    kind = ?event.kind,
                    "subscriber panicked while processing an event"
                );
            }
        }
    }
}
