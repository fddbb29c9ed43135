// Serialization error types
//
// Every failure this layer raises, plus the variants schemes use to report
// codec and policy failures through it unchanged.

use std::any::Any;

use causality_error::{CausalityError, ErrorCode, ErrorDomain, IntoBoxError};
use thiserror::Error;

use crate::encoding::{Encoding, SerializationMagic};
use crate::types::AttachmentId;
use crate::use_case::UseCase;

/// Serialization error codes
pub mod codes {
    use causality_error::ErrorCode;

    // Serialization error codes start with 3000
    pub const EMPTY_INPUT: ErrorCode = ErrorCode(3001);
    pub const MISSING_ATTACHMENTS: ErrorCode = ErrorCode(3002);
    pub const UNKNOWN_FORMAT: ErrorCode = ErrorCode(3003);
    pub const UNSUPPORTED_SCHEME: ErrorCode = ErrorCode(3004);
    pub const NOT_WHITELISTED: ErrorCode = ErrorCode(3005);
    pub const ENCODING_NOT_ACCEPTED: ErrorCode = ErrorCode(3006);
    pub const TYPE_MISMATCH: ErrorCode = ErrorCode(3007);
    pub const UNSUPPORTED_TYPE: ErrorCode = ErrorCode(3008);
    pub const SERIALIZATION_FAILED: ErrorCode = ErrorCode(3009);
    pub const DESERIALIZATION_FAILED: ErrorCode = ErrorCode(3010);
    pub const ENVIRONMENT_NOT_INSTALLED: ErrorCode = ErrorCode(3011);
    pub const ENVIRONMENT_ALREADY_INSTALLED: ErrorCode = ErrorCode(3012);
    pub const CONTEXT_NOT_CONFIGURED: ErrorCode = ErrorCode(3013);
    pub const SCHEME_REGISTRATION_CLOSED: ErrorCode = ErrorCode(3014);
    pub const INVALID_CONFIG: ErrorCode = ErrorCode(3015);
}

/// Error type for serialization operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Empty bytes")]
    EmptyInput,

    #[error("Missing attachments: {}", join_ids(.0))]
    MissingAttachments(Vec<AttachmentId>),

    #[error("Unknown serialization format header: {0}")]
    UnknownFormat(String),

    #[error("Serialization scheme [{magic}, {use_case}] not supported")]
    UnsupportedScheme {
        magic: SerializationMagic,
        use_case: UseCase,
    },

    #[error("Type {0} is not whitelisted")]
    NotWhitelisted(String),

    #[error("Encoding {0} is not accepted")]
    EncodingNotAccepted(Encoding),

    #[error("Deserialized object is not a {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Serialization environment is not installed")]
    EnvironmentNotInstalled,

    #[error("Serialization environment is already installed")]
    EnvironmentAlreadyInstalled,

    #[error("No serialization context configured for use case {0}")]
    ContextNotConfigured(UseCase),

    #[error("All serialization schemes must be registered before any scheme is used")]
    SchemeRegistrationClosed,

    #[error("Invalid serialization config: {0}")]
    InvalidConfig(String),
}

fn join_ids(ids: &[AttachmentId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

impl CausalityError for SerializationError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            SerializationError::EmptyInput => EMPTY_INPUT,
            SerializationError::MissingAttachments(_) => MISSING_ATTACHMENTS,
            SerializationError::UnknownFormat(_) => UNKNOWN_FORMAT,
            SerializationError::UnsupportedScheme { .. } => UNSUPPORTED_SCHEME,
            SerializationError::NotWhitelisted(_) => NOT_WHITELISTED,
            SerializationError::EncodingNotAccepted(_) => ENCODING_NOT_ACCEPTED,
            SerializationError::TypeMismatch { .. } => TYPE_MISMATCH,
            SerializationError::UnsupportedType(_) => UNSUPPORTED_TYPE,
            SerializationError::SerializationFailed(_) => SERIALIZATION_FAILED,
            SerializationError::DeserializationFailed(_) => DESERIALIZATION_FAILED,
            SerializationError::EnvironmentNotInstalled => ENVIRONMENT_NOT_INSTALLED,
            SerializationError::EnvironmentAlreadyInstalled => ENVIRONMENT_ALREADY_INSTALLED,
            SerializationError::ContextNotConfigured(_) => CONTEXT_NOT_CONFIGURED,
            SerializationError::SchemeRegistrationClosed => SCHEME_REGISTRATION_CLOSED,
            SerializationError::InvalidConfig(_) => INVALID_CONFIG,
        }
    }

    fn domain(&self) -> ErrorDomain {
        match self {
            SerializationError::MissingAttachments(_) => ErrorDomain::Attachments,
            SerializationError::EnvironmentNotInstalled
            | SerializationError::EnvironmentAlreadyInstalled
            | SerializationError::ContextNotConfigured(_) => ErrorDomain::Environment,
            SerializationError::NotWhitelisted(_)
            | SerializationError::EncodingNotAccepted(_)
            | SerializationError::UnsupportedType(_)
            | SerializationError::SerializationFailed(_)
            | SerializationError::DeserializationFailed(_) => ErrorDomain::Codec,
            _ => ErrorDomain::Serialization,
        }
    }

    fn is_transient(&self) -> bool {
        // attachments may still be in flight from a peer
        matches!(self, SerializationError::MissingAttachments(_))
    }

    fn as_any(&self) -> &dyn Any { self }
}

/// Convenient Result type for serialization operations
pub type SerializationResult<T> = Result<T, SerializationError>;

/// Convert from serialization error to boxed error
impl From<SerializationError> for Box<dyn CausalityError> {
    fn from(err: SerializationError) -> Self {
        err.into_box_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_attachments_lists_every_id() {
        let a = AttachmentId::new([1u8; 32]);
        let b = AttachmentId::new([2u8; 32]);
        let err = SerializationError::MissingAttachments(vec![a, b]);

        let msg = err.to_string();
        assert!(msg.contains(&a.to_string()));
        assert!(msg.contains(&b.to_string()));
        assert_eq!(err.code(), codes::MISSING_ATTACHMENTS);
        assert_eq!(err.domain(), ErrorDomain::Attachments);
        assert!(err.is_transient());
    }

    #[test]
    fn test_codec_errors_are_not_transient() {
        let err = SerializationError::NotWhitelisted("alloc::string::String".to_string());
        assert_eq!(err.domain(), ErrorDomain::Codec);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_boxing_preserves_kind() {
        let boxed: Box<dyn CausalityError> = SerializationError::EmptyInput.into();
        assert_eq!(boxed.code(), codes::EMPTY_INPUT);
        assert_eq!(
            boxed.downcast_ref::<SerializationError>(),
            Some(&SerializationError::EmptyInput)
        );
    }
}
