//! Terminal attributes.
//!
//! A remote terminal has no kernel line discipline on the server side, so the
//! attributes are bookkeeping: they record what the peer asked for in its pty
//! request and decide how the shell treats input (echo, line editing, signal
//! characters). Entering raw mode and restoring the captured attributes is a
//! plain value swap, which is what makes restoration idempotent.

use bitflags::bitflags;

bitflags! {
    /// Input mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputFlags: u32 {
        /// Map CR to NL on input.
        const ICRNL = 1;
        /// Map NL to CR on input.
        const INLCR = 1 << 1;
        /// Ignore CR on input.
        const IGNCR = 1 << 2;
        /// Enable XON/XOFF flow control.
        const IXON = 1 << 3;
        /// Strip the eighth bit.
        const ISTRIP = 1 << 4;
    }
}

bitflags! {
    /// Output mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutputFlags: u32 {
        /// Enable output post-processing.
        const OPOST = 1;
        /// Map NL to CR-NL on output.
        const ONLCR = 1 << 1;
    }
}

bitflags! {
    /// Local mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LocalFlags: u32 {
        /// Enable signal characters.
        const ISIG = 1;
        /// Canonical (line-by-line) input.
        const ICANON = 1 << 1;
        /// Echo input characters.
        const ECHO = 1 << 2;
        /// Echo erase as backspace-space-backspace.
        const ECHOE = 1 << 3;
        /// Echo NL after the kill character.
        const ECHOK = 1 << 4;
        /// Extended input processing.
        const IEXTEN = 1 << 5;
    }
}

/// Control characters used by the line reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlChars {
    /// Interrupt (Ctrl-C).
    pub intr: u8,
    /// Erase previous character (DEL).
    pub erase: u8,
    /// Kill line (Ctrl-U).
    pub kill: u8,
    /// End of file (Ctrl-D).
    pub eof: u8,
    /// Minimum bytes for a non-canonical read.
    pub vmin: u8,
    /// Non-canonical read timeout in tenths of a second.
    pub vtime: u8,
}

impl Default for ControlChars {
    fn default() -> Self {
        Self {
            intr: 0x03,
            erase: 0x7f,
            kill: 0x15,
            eof: 0x04,
            vmin: 1,
            vtime: 0,
        }
    }
}

/// Snapshot of terminal attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attributes {
    /// Input flags.
    pub input: InputFlags,
    /// Output flags.
    pub output: OutputFlags,
    /// Local flags.
    pub local: LocalFlags,
    /// Control characters.
    pub chars: ControlChars,
}

impl Default for Attributes {
    /// Cooked-mode attributes, as a typical interactive client requests them.
    fn default() -> Self {
        Self {
            input: InputFlags::ICRNL | InputFlags::IXON,
            output: OutputFlags::OPOST | OutputFlags::ONLCR,
            local: LocalFlags::ISIG
                | LocalFlags::ICANON
                | LocalFlags::ECHO
                | LocalFlags::ECHOE
                | LocalFlags::ECHOK
                | LocalFlags::IEXTEN,
            chars: ControlChars::default(),
        }
    }
}

// Terminal mode opcodes from RFC 4254 section 8.
const VINTR: u8 = 1;
const VERASE: u8 = 3;
const VKILL: u8 = 4;
const VEOF: u8 = 5;
const ISTRIP: u8 = 33;
const INLCR: u8 = 34;
const IGNCR: u8 = 35;
const ICRNL: u8 = 36;
const IXON: u8 = 38;
const ISIG: u8 = 50;
const ICANON: u8 = 51;
const ECHO: u8 = 53;
const ECHOE: u8 = 54;
const ECHOK: u8 = 55;
const IEXTEN: u8 = 59;
const OPOST: u8 = 70;
const ONLCR: u8 = 72;

impl Attributes {
    /// Attributes with every flag cleared.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            input: InputFlags::empty(),
            output: OutputFlags::empty(),
            local: LocalFlags::empty(),
            chars: ControlChars::default(),
        }
    }

    /// Derive raw-mode attributes from these ones.
    ///
    /// Line editing, echo and extended processing are switched off, as is
    /// input translation; signal generation and output processing are kept.
    #[must_use]
    pub fn raw(&self) -> Self {
        let mut raw = *self;
        raw.local
            .remove(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::IEXTEN);
        raw.input
            .remove(InputFlags::IXON | InputFlags::ICRNL | InputFlags::INLCR);
        raw.chars.vmin = 0;
        raw.chars.vtime = 1;
        raw
    }

    /// Whether these attributes describe raw mode.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        !self.local.contains(LocalFlags::ICANON) && !self.local.contains(LocalFlags::ECHO)
    }

    /// Whether input is echoed back.
    #[must_use]
    pub const fn echo(&self) -> bool {
        self.local.contains(LocalFlags::ECHO)
    }

    /// Whether newlines are expanded to CR-NL on output.
    #[must_use]
    pub const fn translates_newlines(&self) -> bool {
        self.output.contains(OutputFlags::OPOST) && self.output.contains(OutputFlags::ONLCR)
    }

    /// Apply one encoded terminal mode from an SSH pty request.
    ///
    /// Unknown opcodes are ignored.
    pub fn apply_pty_mode(&mut self, opcode: u8, value: u32) {
        let on = value != 0;
        let char_value = u8::try_from(value).unwrap_or(0);
        match opcode {
            VINTR => self.chars.intr = char_value,
            VERASE => self.chars.erase = char_value,
            VKILL => self.chars.kill = char_value,
            VEOF => self.chars.eof = char_value,
            ISTRIP => self.input.set(InputFlags::ISTRIP, on),
            INLCR => self.input.set(InputFlags::INLCR, on),
            IGNCR => self.input.set(InputFlags::IGNCR, on),
            ICRNL => self.input.set(InputFlags::ICRNL, on),
            IXON => self.input.set(InputFlags::IXON, on),
            ISIG => self.local.set(LocalFlags::ISIG, on),
            ICANON => self.local.set(LocalFlags::ICANON, on),
            ECHO => self.local.set(LocalFlags::ECHO, on),
            ECHOE => self.local.set(LocalFlags::ECHOE, on),
            ECHOK => self.local.set(LocalFlags::ECHOK, on),
            IEXTEN => self.local.set(LocalFlags::IEXTEN, on),
            OPOST => self.output.set(OutputFlags::OPOST, on),
            ONLCR => self.output.set(OutputFlags::ONLCR, on),
            _ => {}
        }
    }

    /// Build attributes from the encoded modes of an SSH pty request,
    /// starting from cooked defaults.
    #[must_use]
    pub fn from_pty_modes<I>(modes: I) -> Self
    where
        I: IntoIterator<Item = (u8, u32)>,
    {
        let mut attrs = Self::default();
        for (opcode, value) in modes {
            attrs.apply_pty_mode(opcode, value);
        }
        attrs
    }
}
