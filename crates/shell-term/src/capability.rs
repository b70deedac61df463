//! Terminal capability codes.
//!
//! Escape sequences are looked up by logical capability rather than written
//! inline. The table is resolved once per terminal type when the session
//! starts; capabilities the terminal type does not support resolve to an
//! empty string and emitting them is a no-op.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use crossterm::Command;
use crossterm::{cursor, terminal};

/// A logical terminal capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Switch to the alternate screen buffer.
    EnterCaMode,
    /// Return from the alternate screen buffer.
    ExitCaMode,
    /// Put the keypad in transmit mode.
    KeypadXmit,
    /// Put the keypad back in local mode.
    KeypadLocal,
    /// Hide the cursor.
    CursorInvisible,
    /// Show the cursor.
    CursorVisible,
    /// Clear the whole screen.
    ClearScreen,
    /// Move the cursor to the top-left corner.
    CursorHome,
    /// Erase from the cursor to the end of the line.
    ClrEol,
    /// Erase from the cursor to the end of the screen.
    ClrEos,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::EnterCaMode,
        Self::ExitCaMode,
        Self::KeypadXmit,
        Self::KeypadLocal,
        Self::CursorInvisible,
        Self::CursorVisible,
        Self::ClearScreen,
        Self::CursorHome,
        Self::ClrEol,
        Self::ClrEos,
    ];

    /// The terminfo name of this capability.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnterCaMode => "enter_ca_mode",
            Self::ExitCaMode => "exit_ca_mode",
            Self::KeypadXmit => "keypad_xmit",
            Self::KeypadLocal => "keypad_local",
            Self::CursorInvisible => "cursor_invisible",
            Self::CursorVisible => "cursor_visible",
            Self::ClearScreen => "clear_screen",
            Self::CursorHome => "cursor_home",
            Self::ClrEol => "clr_eol",
            Self::ClrEos => "clr_eos",
        }
    }

    /// Whether this capability is part of the full-screen feature set.
    const fn is_full_screen(self) -> bool {
        matches!(
            self,
            Self::EnterCaMode
                | Self::ExitCaMode
                | Self::KeypadXmit
                | Self::KeypadLocal
                | Self::CursorInvisible
                | Self::CursorVisible
        )
    }

    fn ansi(self) -> String {
        match self {
            Self::EnterCaMode => ansi_of(&terminal::EnterAlternateScreen),
            Self::ExitCaMode => ansi_of(&terminal::LeaveAlternateScreen),
            // Application cursor keys plus application keypad, as xterm's smkx.
            Self::KeypadXmit => "\x1b[?1h\x1b=".to_string(),
            Self::KeypadLocal => "\x1b[?1l\x1b>".to_string(),
            Self::CursorInvisible => ansi_of(&cursor::Hide),
            Self::CursorVisible => ansi_of(&cursor::Show),
            Self::ClearScreen => ansi_of(&terminal::Clear(terminal::ClearType::All)),
            Self::CursorHome => ansi_of(&cursor::MoveTo(0, 0)),
            Self::ClrEol => ansi_of(&terminal::Clear(terminal::ClearType::UntilNewLine)),
            Self::ClrEos => ansi_of(&terminal::Clear(terminal::ClearType::FromCursorDown)),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render a crossterm command to its ANSI string.
pub(crate) fn ansi_of(command: &impl Command) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = command.write_ansi(&mut out);
    out
}

/// Capability table resolved for one terminal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    term_type: String,
    codes: HashMap<Capability, String>,
}

impl Capabilities {
    /// Resolve the table for a terminal type such as `xterm-256color`.
    ///
    /// `dumb` terminals get an empty table. Console terminals without an
    /// alternate screen (`linux`, `vt100`) get cursor and erase codes only.
    /// Everything else is treated as xterm-compatible.
    #[must_use]
    pub fn for_term(term_type: &str) -> Self {
        let lowered = term_type.to_ascii_lowercase();
        let family = lowered.split('-').next().unwrap_or_default();
        let filter: fn(Capability) -> bool = match family {
            "dumb" => |_| false,
            "linux" | "vt100" | "vt102" | "vt220" => |cap| !cap.is_full_screen(),
            _ => |_| true,
        };
        let codes = Capability::ALL
            .into_iter()
            .filter(|cap| filter(*cap))
            .map(|cap| (cap, cap.ansi()))
            .collect();
        Self {
            term_type: term_type.to_string(),
            codes,
        }
    }

    /// The terminal type this table was resolved for.
    #[must_use]
    pub fn term_type(&self) -> &str {
        &self.term_type
    }

    /// Look up the code for a capability, if supported.
    #[must_use]
    pub fn get(&self, cap: Capability) -> Option<&str> {
        self.codes.get(&cap).map(String::as_str)
    }

    /// Whether the terminal supports a capability.
    #[must_use]
    pub fn supports(&self, cap: Capability) -> bool {
        self.codes.contains_key(&cap)
    }

    /// Write the code for a capability. Unsupported capabilities write nothing.
    pub fn emit<W: Write + ?Sized>(&self, out: &mut W, cap: Capability) -> io::Result<bool> {
        match self.codes.get(&cap) {
            Some(code) => {
                out.write_all(code.as_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::for_term("xterm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xterm_supports_everything() {
        let caps = Capabilities::for_term("xterm-256color");
        for cap in Capability::ALL {
            assert!(caps.supports(cap), "{cap} missing");
        }
        assert_eq!(caps.get(Capability::EnterCaMode), Some("\x1b[?1049h"));
        assert_eq!(caps.get(Capability::CursorInvisible), Some("\x1b[?25l"));
        assert_eq!(caps.get(Capability::KeypadXmit), Some("\x1b[?1h\x1b="));
    }

    #[test]
    fn dumb_is_empty() {
        let caps = Capabilities::for_term("dumb");
        let mut out = Vec::new();
        assert!(!caps.emit(&mut out, Capability::ClearScreen).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn console_has_no_alternate_screen() {
        let caps = Capabilities::for_term("linux");
        assert!(!caps.supports(Capability::EnterCaMode));
        assert!(caps.supports(Capability::ClrEol));
    }

    #[test]
    fn names_match_terminfo() {
        assert_eq!(Capability::KeypadLocal.to_string(), "keypad_local");
        assert_eq!(Capability::ClrEos.name(), "clr_eos");
    }
}
