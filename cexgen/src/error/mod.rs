//! Error types for test synthesis

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, SynthesisError>;

/// Synthesis error
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Neither the symbol table nor the dynamic-type map knows this identifier
    #[error("No type information for symbol {identifier}")]
    MissingTypeInfo { identifier: String },

    #[error("Entry function {identifier} not found in symbol table")]
    UnknownEntryFunction { identifier: String },

    #[error("Symbol {identifier} is not a function")]
    NotAFunction { identifier: String },

    /// Opaque-call log entry that cannot be turned into a stub
    #[error("Malformed opaque call record for {function}: {reason}")]
    MalformedOpaqueCall { function: String, reason: String },

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SynthesisError {
    pub fn missing_type_info(identifier: impl Into<String>) -> Self {
        Self::MissingTypeInfo {
            identifier: identifier.into(),
        }
    }

    pub fn unknown_entry_function(identifier: impl Into<String>) -> Self {
        Self::UnknownEntryFunction {
            identifier: identifier.into(),
        }
    }

    pub fn not_a_function(identifier: impl Into<String>) -> Self {
        Self::NotAFunction {
            identifier: identifier.into(),
        }
    }

    pub fn malformed_opaque_call(
        function: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedOpaqueCall {
            function: function.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that abort synthesis of the whole trace
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingTypeInfo { .. }
                | Self::UnknownEntryFunction { .. }
                | Self::NotAFunction { .. }
                | Self::MalformedOpaqueCall { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_type_info_message() {
        let e = SynthesisError::missing_type_info("java::x");
        assert_eq!(e.to_string(), "No type information for symbol java::x");
        assert!(e.is_fatal());
    }

    #[test]
    fn test_malformed_opaque_call_message() {
        let e = SynthesisError::malformed_opaque_call("java::C.f", "no assignments");
        assert_eq!(
            e.to_string(),
            "Malformed opaque call record for java::C.f: no assignments"
        );
    }

    #[test]
    fn test_format_error_not_fatal() {
        let e = SynthesisError::Format(std::fmt::Error);
        assert!(!e.is_fatal());
    }
}
