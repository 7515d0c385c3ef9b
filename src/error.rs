//! Error types for keyed state operations.

use thiserror::Error;

/// Errors raised while persisting or configuring keyed state.
///
/// Reading state never fails: a stored entry that cannot be decoded is
/// treated as absent and the binding falls back to its default.
#[derive(Error, Debug)]
pub enum StateError {
    /// A value could not be encoded to JSON text. Nothing was written.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored text for `key` is not valid JSON for the requested type.
    #[error("Deserialization error for key '{key}': {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The storage medium rejected an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File-backed storage failed to read or write its file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for keyed state operations.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = StateError::Storage("quota exceeded".to_string());
        assert_eq!(error.to_string(), "Storage error: quota exceeded");

        let error = StateError::Config("unknown backend 'redis'".to_string());
        assert!(error.to_string().contains("unknown backend"));
    }

    #[test]
    fn deserialization_error_names_key() {
        let source = serde_json::from_str::<u32>("{not json").unwrap_err();
        let error = StateError::Deserialization {
            key: "theme".to_string(),
            source,
        };
        assert!(error.to_string().contains("'theme'"));
    }

    #[test]
    fn serde_error_converts_to_serialization() {
        let source = serde_json::from_str::<u32>("oops").unwrap_err();
        let error: StateError = source.into();
        assert!(matches!(error, StateError::Serialization(_)));
    }
}
