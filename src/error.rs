//! Error types for the simulator.
//!
//! Transaction aborts are never represented here — they are a
//! `TransactionStatus` plus a log line (see `model::transaction`). This
//! enum only covers the I/O and input boundary: opening files, reading
//! lines, and parsing CLI flags.

use std::fmt;
use std::io;

/// Unified error type for repcrec operations.
#[derive(Debug)]
pub enum RepCRecError {
    /// I/O error (opening/reading the instruction file or output file).
    Io(io::Error),
    /// A line could not be parsed into a well-formed instruction.
    Parse(String),
    /// A CLI flag was malformed (e.g. a non-numeric argument to `-n`).
    Cli(String),
}

impl fmt::Display for RepCRecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepCRecError::Io(e) => write!(f, "{}", e),
            RepCRecError::Parse(msg) => write!(f, "parse error: {}", msg),
            RepCRecError::Cli(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for RepCRecError {}

impl From<io::Error> for RepCRecError {
    fn from(e: io::Error) -> Self {
        RepCRecError::Io(e)
    }
}

/// Result type alias for repcrec operations.
pub type Result<T> = std::result::Result<T, RepCRecError>;
