//! Terminal geometry.

use crate::error::{Result, TermError};

/// Default terminal width when the peer did not request a pty.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal height when the peer did not request a pty.
pub const DEFAULT_ROWS: u16 = 24;

/// Terminal size in character cells.
///
/// A row count of `0` is meaningful for rendering: it means "no row budget",
/// i.e. the display grows with the content instead of being clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalSize {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl TerminalSize {
    /// Create a new terminal size.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Create a size from the 32-bit dimensions carried by SSH requests,
    /// saturating at `u16::MAX`.
    #[must_use]
    pub fn from_wire(cols: u32, rows: u32) -> Self {
        Self {
            cols: u16::try_from(cols).unwrap_or(u16::MAX),
            rows: u16::try_from(rows).unwrap_or(u16::MAX),
        }
    }

    /// Validate that the size has at least one column.
    pub const fn validate(self) -> Result<Self> {
        if self.cols == 0 {
            return Err(TermError::InvalidSize {
                cols: self.cols,
                rows: self.rows,
            });
        }
        Ok(self)
    }

    /// Same size with a different row count.
    #[must_use]
    pub const fn with_rows(self, rows: u16) -> Self {
        Self {
            cols: self.cols,
            rows,
        }
    }

    /// Whether rendering should be clipped to a row budget.
    #[must_use]
    pub const fn has_row_budget(&self) -> bool {
        self.rows > 0
    }
}
