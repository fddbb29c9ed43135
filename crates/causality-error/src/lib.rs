// Causality Error Handling Framework
// Central location for error traits, domains and codes shared by the serialization crates

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

// Re-export common error handling tools for convenience
pub use anyhow;
pub use thiserror;

mod conversion;

pub use conversion::IntoBoxError;

/// Error domains representing different components of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorDomain {
    Core,
    Serialization,
    Environment,
    Attachments,
    Codec,
    External,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Core => write!(f, "core"),
            ErrorDomain::Serialization => write!(f, "serialization"),
            ErrorDomain::Environment => write!(f, "environment"),
            ErrorDomain::Attachments => write!(f, "attachments"),
            ErrorDomain::Codec => write!(f, "codec"),
            ErrorDomain::External => write!(f, "external"),
        }
    }
}

/// Error code structure for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Standard error message format for serialization
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub domain: ErrorDomain,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorMessage {
    /// Capture the code, domain and rendered message of an error
    pub fn from_error(err: &dyn CausalityError) -> Self {
        Self {
            code: err.code(),
            domain: err.domain(),
            message: CausalityError::description(err),
            details: err.context().map(serde_json::Value::String),
        }
    }
}

/// Standard Result type using BoxError
pub type Result<T> = std::result::Result<T, BoxError>;
/// Shorthand for a boxed CausalityError
pub type BoxError = Box<dyn CausalityError>;

/// Base trait for all errors in the Causality system.
pub trait CausalityError: StdError + fmt::Debug + fmt::Display + Send + Sync + Any + 'static {
    /// Numeric code identifying this error kind.
    fn code(&self) -> ErrorCode;

    /// Component the error originates from.
    fn domain(&self) -> ErrorDomain;

    /// Provides a brief description of the error (defaults to Display impl).
    fn description(&self) -> String { format!("{}", self) }

    /// Provides context specific to the error (optional).
    fn context(&self) -> Option<String> { None }

    /// Indicates if the error is temporary and retrying might succeed (optional).
    fn is_transient(&self) -> bool { false }

    /// Returns this error as a `&dyn Any` to allow downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl dyn CausalityError {
    /// Downcast a boxed error back to its concrete type
    pub fn downcast_ref<E: CausalityError>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("probe failed: {0}")]
    struct ProbeError(String);

    impl CausalityError for ProbeError {
        fn code(&self) -> ErrorCode { ErrorCode(42) }
        fn domain(&self) -> ErrorDomain { ErrorDomain::Core }
        fn as_any(&self) -> &dyn Any { self }
    }

    #[test]
    fn test_error_code_display_is_zero_padded() {
        assert_eq!(ErrorCode(7).to_string(), "0007");
        assert_eq!(ErrorCode(3012).to_string(), "3012");
    }

    #[test]
    fn test_error_message_captures_code_and_domain() {
        let err = ProbeError("boom".to_string());
        let msg = ErrorMessage::from_error(&err);

        assert_eq!(msg.code, ErrorCode(42));
        assert_eq!(msg.domain, ErrorDomain::Core);
        assert_eq!(msg.message, "probe failed: boom");
        assert!(msg.details.is_none());

        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_boxed_error_downcast() {
        let boxed: BoxError = Box::new(ProbeError("x".to_string()));
        assert!(boxed.downcast_ref::<ProbeError>().is_some());
        assert!(!boxed.is_transient());
    }
}
