use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Most recent free-form result of a monitor, for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Text summary of the latest observation.
    pub message: String,
    /// Optional rendered chart or screenshot backing the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file: Option<PathBuf>,
}

impl Analysis {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            image_file: None,
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_file_uses_camel_case() {
        let analysis = Analysis::new("3rd data").with_image("/tmp/chart.png");
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"imageFile\":\"/tmp/chart.png\""));
    }
}
