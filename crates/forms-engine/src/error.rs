//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Input could not be read as a form at all
    #[error("malformed form structure: {0}")]
    MalformedForm(String),

    /// Formula failed to parse or evaluate
    #[error("formula error in field {field_id}: {source}")]
    Formula {
        field_id: String,
        #[source]
        source: forms_expr::ExprError,
    },

    #[error("field {0} is part of a circular dependency")]
    Circular(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
