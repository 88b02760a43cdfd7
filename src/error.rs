//! Internal fault taxonomy
//!
//! Expected validation outcomes are returned as data (see `validation` and
//! `card`). The variants here describe faults in the validator's own inputs:
//! malformed rule descriptors, uncompilable patterns and unreadable rule files.

use thiserror::Error;

/// Errors raised while configuring the validator
#[derive(Debug, Error)]
pub enum GuardError {
    /// A rule was registered under an empty or blank field name
    #[error("field name must not be empty")]
    EmptyFieldName,

    /// A rule descriptor carried a zero maximum length
    #[error("rule for '{field}' must declare a positive max_length")]
    ZeroMaxLength { field: String },

    /// A rule descriptor could not be decoded (missing or mistyped property)
    #[error("rule for '{field}' is malformed: {reason}")]
    MalformedDescriptor { field: String, reason: String },

    /// A rule pattern failed to compile
    #[error("rule for '{field}' has an invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

pub type GuardResult<T> = Result<T, GuardError>;
