//! Error types for viewport resolution and scanner coordination.

use thiserror::Error;

use crate::constraint::Margin;

/// Failure reported by the native scanning layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NativeError {
    /// Message as reported by the native layer.
    pub message: String,
}

impl NativeError {
    /// Create a native error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::new(s)
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::new(s)
    }
}

/// Errors that can occur while resolving margins or driving the scanner.
///
/// Nothing here is fatal to the process. State desynchronization is not an
/// error value; it is retried by the coordinator and logged.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A margin string could not be parsed as a percentage.
    #[error("invalid {side} margin: {value:?}")]
    InvalidMargin { side: Margin, value: String },

    /// Screen dimensions cannot be used to normalize a rectangle.
    #[error("screen has a zero or non-finite dimension ({width}x{height})")]
    ZeroScreenDimension { width: f64, height: f64 },

    /// The native layer reported a state code missing from its capability table.
    #[error("unknown native scanner state code {0}")]
    UnknownNativeState(i32),

    /// A call into the native layer failed.
    #[error("native {op} failed: {source}")]
    Native {
        op: &'static str,
        #[source]
        source: NativeError,
    },

    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("config serialize error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Wrap a native failure with the name of the operation that produced it.
    pub fn native(op: &'static str, source: NativeError) -> Self {
        ScanError::Native { op, source }
    }
}

/// Result type alias for scanner operations.
pub type ScanResult<T> = Result<T, ScanError>;
