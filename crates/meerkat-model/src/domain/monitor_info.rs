use serde::{Deserialize, Serialize};

use crate::{MonitorCode, MonitorName};

/// Catalogue entry describing one monitor kind known to the factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub code: MonitorCode,
    pub name: MonitorName,
}
