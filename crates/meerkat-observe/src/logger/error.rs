use thiserror::Error;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format '{0}', expected one of: text, json, journald")]
    InvalidFormat(String),
    #[error("invalid log filter '{level}': {reason}")]
    InvalidLogLevel { level: String, reason: String },
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("logger setup failed: {0}")]
    InitializationFailed(String),
}
