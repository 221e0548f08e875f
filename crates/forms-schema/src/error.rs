//! Error types for the schema crate

use thiserror::Error;

/// Schema error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Input is not a JSON object
    #[error("form structure must be a JSON object")]
    NotAnObject,

    /// A required collection is missing or has the wrong shape
    #[error("{location} must contain a \"{property}\" array")]
    MissingCollection { location: String, property: String },

    /// A field definition could not be read at all
    #[error("{location}: malformed field definition: {reason}")]
    MalformedField { location: String, reason: String },

    /// A field property is present but of the wrong JSON type
    #[error("{location}: property \"{property}\" is malformed: {reason}")]
    MistypedProperty { location: String, property: String, reason: String },

    /// Unknown enum value
    #[error("unknown {kind} \"{value}\"")]
    UnknownValue { kind: &'static str, value: String },
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
