//! shell-term: terminal primitives for remote shell sessions
//!
//! This crate provides the building blocks a server-side shell needs to
//! drive a terminal it does not own: the peer's keystrokes arrive over the
//! network and output is sent back the same way.
//!
//! # Features
//!
//! - **In-memory terminal** with a transport-side remote handle
//! - **Attribute bookkeeping** including SSH pty mode decoding and raw mode
//! - **Capability table** resolved per terminal type
//! - **Incremental display** that only rewrites changed rows
//! - **Key bindings** with multi-byte sequences and ambiguity timeouts
//! - **Cancel-safe timed input** suitable for `tokio::select!`
//! - **Line reader** with erase, kill, interrupt and history recall
//!
//! # Example
//!
//! ```ignore
//! use shell_term::{Display, StyledLine, Terminal};
//!
//! let (mut term, mut remote) = Terminal::builder().term_type("xterm").build()?;
//! let mut display = Display::new(term.capabilities(), false);
//! display.resize(0, term.size().cols);
//! display.update(&[StyledLine::plain("hello")], 0, &mut term)?;
//! term.flush()?;
//! let bytes = remote.drain_output();
//! ```

pub mod attributes;
pub mod capability;
pub mod display;
pub mod error;
pub mod keymap;
pub mod line;
pub mod reader;
pub mod size;
pub mod style;
pub mod terminal;

pub use attributes::{Attributes, ControlChars, InputFlags, LocalFlags, OutputFlags};
pub use capability::{Capabilities, Capability};
pub use display::Display;
pub use error::{Result, TermError};
pub use keymap::{KeyMap, Lookup};
pub use line::{LineReader, ReadLine};
pub use reader::{BindingReader, NonBlockingReader, Peek};
pub use size::TerminalSize;
pub use style::{Color, Span, Style, StyledLine, UnknownColor, background_colored, colored};
pub use terminal::{Terminal, TerminalBuilder, TerminalRemote};
