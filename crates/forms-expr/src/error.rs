//! Expression errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number \"{0}\"")]
    InvalidNumber(String),

    #[error("unterminated reference starting at position {0}")]
    UnterminatedReference(usize),

    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("empty expression")]
    Empty,

    #[error("unknown reference \"{0}\"")]
    UnknownReference(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression is nested too deeply")]
    TooDeep,
}

pub type Result<T> = std::result::Result<T, ExprError>;
