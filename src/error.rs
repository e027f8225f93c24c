//! Error types for the provider framework.

use thiserror::Error;

/// Errors raised by framework plumbing.
///
/// Provider-visible failures travel as [`crate::Diagnostics`] on operation
/// responses; `FrameworkError` covers the conversions underneath them, such
/// as decoding raw state payloads or private state data.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// A value did not match the type it was decoded against.
    #[error("Value conversion error: {0}")]
    ValueConversion(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FrameworkError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::ValueConversion(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameworkError::ValueConversion("expected int64, found string".to_string());
        assert_eq!(
            format!("{}", err),
            "Value conversion error: expected int64, found string"
        );
    }

    #[test]
    fn test_message_method() {
        let err = FrameworkError::ValueConversion("expected bool, found array".to_string());
        assert_eq!(err.message(), "expected bool, found array");

        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FrameworkError::from(serde_err);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_serialization_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: FrameworkError = serde_err.into();
        assert!(matches!(err, FrameworkError::Serialization(_)));
        assert!(format!("{}", err).starts_with("Serialization error:"));
    }
}
