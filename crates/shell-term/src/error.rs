//! Error types for the shell-term crate.
//!
//! This module provides a unified error type [`TermError`] covering the
//! failure modes of a remote terminal: I/O on the input stream, a peer that
//! stopped consuming output, and invalid geometry.

use std::io;

/// The error type for terminal operations.
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    /// An I/O error occurred while reading terminal input.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// The remote side stopped accepting output.
    #[error("terminal output has been closed")]
    OutputClosed,

    /// Invalid window size specified.
    #[error("invalid window size: {cols}x{rows}")]
    InvalidSize {
        /// The requested column count.
        cols: u16,
        /// The requested row count.
        rows: u16,
    },
}

impl TermError {
    /// Check if this error means the remote peer has gone away.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::OutputClosed)
    }
}

/// A specialized Result type for terminal operations.
pub type Result<T> = std::result::Result<T, TermError>;
