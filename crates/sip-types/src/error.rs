use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("missing required packaging field: {0}")]
    MissingField(&'static str),

    #[error("unknown hash function: {0}")]
    UnknownHashFunction(String),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
