//! Error types for reading and comparing simulation output.

use thiserror::Error;

/// A header or data line that does not have the expected shape.
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("file has no header line")]
    MissingHeader,

    #[error("header must have 4 fields, but has {0}")]
    HeaderLength(usize),

    #[error("header field {name} is not a valid number: {token:?}")]
    HeaderField { name: &'static str, token: String },

    #[error("header field {name} must be positive, but is {token}")]
    NonPositive { name: &'static str, token: String },

    #[error("token {index} is not a valid number: {token:?}")]
    Number { index: usize, token: String },

    #[error("unbalanced bracket at column {0}")]
    Bracket(usize),

    #[error("number outside brackets at column {0}")]
    Ungrouped(usize),

    #[error("bird {index} must have 4 fields, but has {len}")]
    GroupSize { index: usize, len: usize },

    #[error("data line has no tokens")]
    Empty,
}

/// Two files whose header tokens differ.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("wrong headers: {label_a} has {tokens_a:?}, {label_b} has {tokens_b:?}")]
pub struct HeaderMismatch {
    pub label_a: String,
    pub tokens_a: Vec<String>,
    pub label_b: String,
    pub tokens_b: Vec<String>,
}

/// One file ran out of timesteps while the other still had some.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{ended} ended after {timesteps} timesteps while {other} still has data")]
pub struct DesyncError {
    pub ended: String,
    pub other: String,
    pub timesteps: usize,
}
