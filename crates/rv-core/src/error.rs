//! Unified error type for recverify.
//!
//! Every fatal reconciliation failure funnels into [`Error`]. Non-fatal
//! findings (corruption warnings) are plain data carried on the result and are
//! never represented here.

use std::fmt;

use crate::media::{format_timestamp, StreamKind};

/// Unified error type covering all fatal failure modes in recverify.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two successive captures could not be stitched together.
    #[error("Alignment failure between '{previous}' and '{current}': {reason}")]
    Alignment {
        /// Name of the earlier capture.
        previous: String,
        /// Name of the capture that failed to align.
        current: String,
        /// Human-readable description of the matching outcome.
        reason: String,
    },

    /// Captures disagree on content at a position where they must agree.
    #[error(
        "{stream} hash check error at {} ({start_seconds:.3}s)",
        timestamp(.start_seconds)
    )]
    HashCheckDifference {
        /// The stream whose content hashes differ.
        stream: StreamKind,
        /// Start of the offending segment in seconds.
        start_seconds: f64,
    },

    /// Input records failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

fn timestamp(seconds: &f64) -> String {
    format_timestamp(*seconds)
}

impl Error {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Alignment { .. } => 3,
            Error::HashCheckDifference { .. } => 4,
            Error::InvalidInput(_) => 2,
            Error::Parse(_) => 2,
            Error::Io { .. } => 1,
        }
    }

    /// Short machine-readable category name.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Alignment { .. } => "alignment_failure",
            Error::HashCheckDifference { .. } => "hash_check_difference",
            Error::InvalidInput(_) => "invalid_input",
            Error::Parse(_) => "parse",
            Error::Io { .. } => "io",
        }
    }

    /// Convenience constructor for [`Error::Alignment`].
    pub fn alignment(
        previous: impl Into<String>,
        current: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Error::Alignment {
            previous: previous.into(),
            current: current.into(),
            reason: reason.to_string(),
        }
    }

    /// Convenience constructor for [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Convenience constructor for [`Error::Parse`].
    pub fn parse(msg: impl fmt::Display) -> Self {
        Error::Parse(msg.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
