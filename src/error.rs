//! Error types and utilities for canopy configuration management.

/// Result type alias for canopy operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Comprehensive error types for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Requested configuration key was not found
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// A configuration key could not be parsed
    #[error("Invalid key '{key}': {message}")]
    KeyParse { key: String, message: String },

    /// A key that must select exactly one node selected zero or several
    #[error("Key '{key}' does not select exactly one node ({count} matches)")]
    NotUnique { key: String, count: usize },

    /// The expression engine failed to evaluate a key against the tree
    #[error("Expression engine error: {0}")]
    Engine(String),

    /// Type conversion failed
    #[error("Type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// An argument violated a constructor or operation contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A flat configuration source reported a failure
    #[error("Source error: {0}")]
    Source(String),
}

impl ConfigError {
    /// Creates a new key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates a new key parse error with context.
    pub fn key_parse(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeyParse {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new non-unique key error.
    pub fn not_unique(key: impl Into<String>, count: usize) -> Self {
        Self::NotUnique {
            key: key.into(),
            count,
        }
    }

    /// Creates a new expression engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    /// Creates a new type conversion error.
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a new source error.
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Returns true if this error is related to a missing key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, ConfigError::KeyNotFound { .. })
    }

    /// Returns true if this error is related to key parsing.
    pub fn is_key_parse(&self) -> bool {
        matches!(self, ConfigError::KeyParse { .. })
    }

    /// Returns true if this error came from the expression engine.
    pub fn is_engine(&self) -> bool {
        matches!(self, ConfigError::Engine(_))
    }

    /// Returns true if this error is related to type conversion.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self, ConfigError::TypeConversion { .. })
    }

    /// Returns true if this error reports a non-unique key match.
    pub fn is_not_unique(&self) -> bool {
        matches!(self, ConfigError::NotUnique { .. })
    }

    /// Returns true if this error reports an invalid argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ConfigError::InvalidArgument(_))
    }

    /// Returns true if this error came from a flat source.
    pub fn is_source(&self) -> bool {
        matches!(self, ConfigError::Source(_))
    }
}
