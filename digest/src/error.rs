//! Error types of the percentile aggregation core

use thiserror::Error;

use crate::plan_cache::TableReferenceOutOfDate;

/// A literal argument that failed validation while the query was compiled.
///
/// `position` is the locator of the offending argument as supplied by the host, see
/// [`crate::factory::PositionedArg`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("[{position}] {message}")]
pub struct ArgumentError {
    pub position: usize,
    pub message: String,
}

impl ArgumentError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DigestError {
    #[error("cannot merge digests of different shape: {0}")]
    IncompatibleMerge(String),
    #[error("cannot combine group tables built by different functions: {0}")]
    IncompatibleTables(String),
    #[error("error encoding digest snapshot: {0}")]
    Encode(String),
    #[error("error decoding digest snapshot: {0}")]
    Decode(String),
    #[error("digest count overflows u64")]
    CountOverflow,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Digest(#[from] DigestError),
    #[error(transparent)]
    StalePlan(#[from] TableReferenceOutOfDate),
}

pub type Result<T> = std::result::Result<T, Error>;
