use serde::{Deserialize, Serialize};

/// Alert raised by a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Human-readable alert text; the operator prefixes it with the monitor name.
    pub message: String,
}

impl Alarm {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of one `do_check` observation.
///
/// `ok == false` means the monitor could not observe its source this time.
/// An `ok` result may still carry an [`Alarm`] when the observation itself is alarming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm: Option<Alarm>,
}

impl CheckResult {
    /// Successful observation, nothing to report.
    pub fn ok() -> Self {
        Self {
            ok: true,
            alarm: None,
        }
    }

    /// Successful observation that raises an alarm.
    pub fn alarm(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            alarm: Some(Alarm::new(message)),
        }
    }

    /// The monitor could not observe its source.
    pub fn failed() -> Self {
        Self {
            ok: false,
            alarm: None,
        }
    }

    /// Alarm text, if the result carries a non-empty one.
    pub fn alarm_message(&self) -> Option<&str> {
        self.alarm
            .as_ref()
            .map(|a| a.message.as_str())
            .filter(|m| !m.trim().is_empty())
    }
}
