//! Minimal line reader.
//!
//! Supports typing at the end of the line, erase, kill-line, interrupt,
//! end-of-file on an empty line and history recall with the up/down arrows.
//! The terminal is switched to raw mode while a line is being read and the
//! reader echoes input itself.

use std::io::Write;
use std::time::Duration;

use unicode_width::UnicodeWidthChar;

use crate::attributes::Attributes;
use crate::error::Result;
use crate::reader::Peek;
use crate::terminal::Terminal;

/// Default number of remembered lines.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// How long to wait for the rest of an escape sequence.
const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;
const ESC: u8 = 0x1b;

/// Outcome of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line, without its terminator.
    Line(String),
    /// The interrupt character was typed. The partial line is discarded.
    Interrupted,
    /// End of file on an empty line, or end of input.
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrow {
    Up,
    Down,
}

/// Reads edited lines from a [`Terminal`].
#[derive(Debug, Clone)]
pub struct LineReader {
    history: Vec<String>,
    max_history: usize,
    after_cr: bool,
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReader {
    /// Create a reader with the default history size.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_history_size(DEFAULT_HISTORY_SIZE)
    }

    /// Create a reader keeping at most `max_history` lines.
    #[must_use]
    pub const fn with_history_size(max_history: usize) -> Self {
        Self {
            history: Vec::new(),
            max_history,
            after_cr: false,
        }
    }

    /// Lines entered so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Add a line to the history, skipping blanks and repeats.
    pub fn add_history(&mut self, line: &str) {
        if line.trim().is_empty() || self.history.last().is_some_and(|last| last == line) {
            return;
        }
        self.history.push(line.to_string());
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }

    /// Print `prompt` and read one line.
    ///
    /// Non-empty lines are added to the history. The terminal attributes
    /// are restored before returning, whatever the outcome.
    pub async fn read_line(&mut self, term: &mut Terminal, prompt: &str) -> Result<ReadLine> {
        let saved = term.enter_raw_mode();
        let result = self.read_raw(term, prompt, saved).await;
        term.set_attributes(saved);
        let read = result?;
        if let ReadLine::Line(line) = &read {
            self.add_history(line);
        }
        Ok(read)
    }

    async fn read_raw(
        &mut self,
        term: &mut Terminal,
        prompt: &str,
        cooked: Attributes,
    ) -> Result<ReadLine> {
        term.write_all(prompt.as_bytes())?;
        term.flush()?;

        let chars = cooked.chars;
        let mut line = String::new();
        let mut partial: Vec<u8> = Vec::new();
        let mut recall = self.history.len();

        loop {
            let Some(byte) = term.reader().read_byte().await? else {
                return Ok(ReadLine::Eof);
            };
            let after_cr = std::mem::replace(&mut self.after_cr, byte == b'\r');

            match byte {
                b'\n' if after_cr => {}
                b'\r' | b'\n' => {
                    term.write_all(b"\r\n")?;
                    term.flush()?;
                    return Ok(ReadLine::Line(line));
                }
                b if b == chars.intr => {
                    term.write_all(b"^C\r\n")?;
                    term.flush()?;
                    return Ok(ReadLine::Interrupted);
                }
                b if b == chars.eof => {
                    if line.is_empty() {
                        term.write_all(b"\r\n")?;
                        term.flush()?;
                        return Ok(ReadLine::Eof);
                    }
                }
                b if b == chars.erase || b == BACKSPACE || b == DELETE => {
                    if let Some(c) = line.pop() {
                        erase_cells(term, c.width().unwrap_or(0))?;
                    }
                }
                b if b == chars.kill => {
                    let width = crate::style::text_width(&line);
                    line.clear();
                    erase_cells(term, width)?;
                }
                ESC => {
                    if let Some(arrow) = read_arrow(term).await? {
                        let replacement = match arrow {
                            Arrow::Up if recall > 0 => {
                                recall -= 1;
                                Some(self.history[recall].clone())
                            }
                            Arrow::Down if recall < self.history.len() => {
                                recall += 1;
                                Some(self.history.get(recall).cloned().unwrap_or_default())
                            }
                            _ => None,
                        };
                        if let Some(replacement) = replacement {
                            erase_cells(term, crate::style::text_width(&line))?;
                            term.write_all(replacement.as_bytes())?;
                            line = replacement;
                        }
                    }
                }
                b if b < 0x20 => {}
                b => {
                    partial.push(b);
                    match std::str::from_utf8(&partial) {
                        Ok(text) => {
                            line.push_str(text);
                            if cooked.echo() {
                                term.write_all(&partial)?;
                            }
                            partial.clear();
                        }
                        Err(e) if e.error_len().is_some() => partial.clear(),
                        Err(_) => {}
                    }
                }
            }
            term.flush()?;
        }
    }
}

fn erase_cells(term: &mut Terminal, cells: usize) -> Result<()> {
    for _ in 0..cells {
        term.write_all(b"\x08 \x08")?;
    }
    Ok(())
}

/// Decode the rest of a cursor key sequence (`ESC [ A` or `ESC O A`).
async fn read_arrow(term: &mut Terminal) -> Result<Option<Arrow>> {
    let reader = term.reader();
    let Peek::Byte(intro) = reader.peek_timeout(ESCAPE_TIMEOUT).await? else {
        return Ok(None);
    };
    if intro != b'[' && intro != b'O' {
        return Ok(None);
    }
    reader.try_read_byte();
    let Peek::Byte(code) = reader.peek_timeout(ESCAPE_TIMEOUT).await? else {
        return Ok(None);
    };
    reader.try_read_byte();
    Ok(match code {
        b'A' => Some(Arrow::Up),
        b'B' => Some(Arrow::Down),
        _ => None,
    })
}
