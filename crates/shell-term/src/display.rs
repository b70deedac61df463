//! Incremental line renderer.
//!
//! [`Display`] remembers the last frame it drew and, on each update, only
//! rewrites the rows whose content changed. Identical frames produce no
//! output at all. In full-screen mode rows are addressed absolutely from the
//! top of the screen; inline mode addresses them relative to the first row
//! of the region the display owns, which starts at the cursor position of
//! the first update.

use std::io::{self, Write};

use crossterm::cursor;

use crate::capability::{Capabilities, Capability, ansi_of};
use crate::style::StyledLine;

/// Stateful, double-buffered screen writer.
#[derive(Debug, Clone)]
pub struct Display {
    caps: Capabilities,
    full_screen: bool,
    rows: u16,
    cols: u16,
    previous: Vec<StyledLine>,
    cursor_row: usize,
    at_line_start: bool,
    needs_clear: bool,
}

impl Display {
    /// Create a display for a terminal with the given capabilities.
    #[must_use]
    pub fn new(caps: &Capabilities, full_screen: bool) -> Self {
        Self {
            caps: caps.clone(),
            full_screen,
            rows: 0,
            cols: crate::size::DEFAULT_COLS,
            previous: Vec::new(),
            cursor_row: 0,
            at_line_start: false,
            // The alternate screen is not guaranteed to start blank.
            needs_clear: full_screen,
        }
    }

    /// Set the row and column budget. `rows == 0` disables row clipping.
    pub const fn resize(&mut self, rows: u16, cols: u16) {
        self.rows = rows;
        self.cols = cols;
    }

    /// Current `(rows, cols)` budget.
    #[must_use]
    pub const fn budget(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    /// Whether the display runs in full-screen mode.
    #[must_use]
    pub const fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    /// Forget the previous frame: the next update starts from a cleared
    /// region and rewrites every row.
    pub const fn clear(&mut self) {
        self.needs_clear = true;
    }

    /// Number of lines in the last rendered frame.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.previous.len()
    }

    /// Render `lines`, then leave the cursor at the start of `cursor_row`.
    ///
    /// Lines are cut to the column budget and, when a row budget is set, to
    /// the first `rows` lines.
    pub fn update<W: Write + ?Sized>(
        &mut self,
        lines: &[StyledLine],
        cursor_row: usize,
        out: &mut W,
    ) -> io::Result<()> {
        let limit = if self.rows > 0 {
            usize::from(self.rows)
        } else {
            usize::MAX
        };
        let cols = usize::from(self.cols);
        let frame: Vec<StyledLine> = lines
            .iter()
            .take(limit)
            .map(|line| line.truncate(cols))
            .collect();

        let mut buf = String::new();
        if self.needs_clear {
            self.write_clear(&mut buf);
            self.previous.clear();
            self.needs_clear = false;
        }

        for (row, line) in frame.iter().enumerate() {
            if self.previous.get(row) == Some(line) {
                continue;
            }
            self.move_to(row, &mut buf);
            buf.push_str(&line.to_ansi());
            // A full-width line leaves the cursor in the pending-wrap column,
            // where an erase would eat the last character.
            if line.width() < cols {
                self.push_cap(&mut buf, Capability::ClrEol);
            }
            self.at_line_start = false;
        }

        if self.previous.len() > frame.len() {
            self.move_to(frame.len(), &mut buf);
            self.push_cap(&mut buf, Capability::ClrEos);
        }

        let target = cursor_row.min(frame.len().saturating_sub(1));
        if !buf.is_empty() || self.cursor_row != target {
            self.move_to(target, &mut buf);
        }

        self.previous = frame;
        if !buf.is_empty() {
            out.write_all(buf.as_bytes())?;
        }
        Ok(())
    }

    fn write_clear(&mut self, buf: &mut String) {
        if self.full_screen {
            self.push_cap(buf, Capability::CursorHome);
            self.push_cap(buf, Capability::ClearScreen);
            self.cursor_row = 0;
            self.at_line_start = true;
        } else {
            self.move_to(0, buf);
            self.push_cap(buf, Capability::ClrEos);
        }
    }

    fn move_to(&mut self, row: usize, buf: &mut String) {
        if row == self.cursor_row && self.at_line_start {
            return;
        }
        if self.full_screen {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            buf.push_str(&ansi_of(&cursor::MoveTo(0, row)));
        } else if row < self.cursor_row {
            let up = u16::try_from(self.cursor_row - row).unwrap_or(u16::MAX);
            buf.push_str(&ansi_of(&cursor::MoveUp(up)));
            buf.push('\r');
        } else {
            buf.push('\r');
            for _ in self.cursor_row..row {
                buf.push_str("\r\n");
            }
        }
        self.cursor_row = row;
        self.at_line_start = true;
    }

    fn push_cap(&self, buf: &mut String, cap: Capability) {
        if let Some(code) = self.caps.get(cap) {
            buf.push_str(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, Style};

    fn lines(texts: &[&str]) -> Vec<StyledLine> {
        texts.iter().map(|t| StyledLine::plain(*t)).collect()
    }

    fn render(display: &mut Display, texts: &[&str]) -> String {
        let mut out = Vec::new();
        display.update(&lines(texts), 0, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn identical_frames_write_nothing() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 80);
        let first = render(&mut display, &["a", "b", "c"]);
        assert!(first.contains('a') && first.contains('c'));
        let second = render(&mut display, &["a", "b", "c"]);
        assert!(second.is_empty(), "unexpected output {second:?}");
    }

    #[test]
    fn only_changed_rows_rewritten() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 80);
        render(&mut display, &["alpha", "beta", "gamma"]);
        let out = render(&mut display, &["alpha", "BETA", "gamma"]);
        assert!(out.contains("BETA"));
        assert!(!out.contains("alpha"));
        assert!(!out.contains("gamma"));
    }

    #[test]
    fn shorter_frame_erases_tail() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 80);
        render(&mut display, &["a", "b", "c"]);
        let out = render(&mut display, &["a"]);
        assert!(out.contains("\x1b[J"));
        assert_eq!(display.line_count(), 1);
    }

    #[test]
    fn lines_truncated_to_columns() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 4);
        let out = render(&mut display, &["abcdefgh"]);
        assert!(out.contains("abcd"));
        assert!(!out.contains("abcde"));
    }

    #[test]
    fn row_budget_limits_lines() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(2, 80);
        let out = render(&mut display, &["one", "two", "three"]);
        assert!(!out.contains("three"));
        assert_eq!(display.line_count(), 2);
    }

    #[test]
    fn clear_forces_full_redraw() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 80);
        render(&mut display, &["same"]);
        display.clear();
        let out = render(&mut display, &["same"]);
        assert!(out.starts_with("\x1b[J"));
        assert!(out.contains("same"));
    }

    #[test]
    fn full_screen_uses_absolute_moves() {
        let mut display = Display::new(&Capabilities::default(), true);
        display.resize(24, 80);
        let out = render(&mut display, &["x", "y"]);
        assert!(out.starts_with("\x1b[1;1H\x1b[2J"));
        assert!(out.contains("\x1b[2;1Hy"));
        assert!(out.ends_with("\x1b[1;1H"));
    }

    #[test]
    fn inline_returns_to_first_row() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 80);
        let out = render(&mut display, &["x", "y", "z"]);
        assert!(out.ends_with("\x1b[2A\r"));
    }

    #[test]
    fn styled_lines_keep_style() {
        let mut display = Display::new(&Capabilities::default(), false);
        display.resize(0, 80);
        let line = StyledLine::styled("warn", Style::new().fg(Color::Yellow));
        let mut out = Vec::new();
        display.update(&[line], 0, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("\x1b[38;5;3mwarn\x1b[0m"));
    }
}
