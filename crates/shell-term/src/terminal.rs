//! In-memory terminal backing a remote session.
//!
//! A [`Terminal`] is the session-side view of a remote pty: it reads the
//! peer's keystrokes from an in-memory pipe, writes output into a channel
//! drained by the transport, tracks the window size the peer reports and
//! keeps the attribute bookkeeping. The transport side holds the matching
//! [`TerminalRemote`].

use std::fmt;
use std::io::{self, Write};

use bytes::Bytes;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::{mpsc, watch};

use crate::attributes::Attributes;
use crate::capability::{Capabilities, Capability};
use crate::error::{Result, TermError};
use crate::reader::NonBlockingReader;
use crate::size::TerminalSize;

/// Default input pipe capacity in bytes.
const INPUT_CAPACITY: usize = 64 * 1024;

/// Builder for a [`Terminal`] and its [`TerminalRemote`].
#[derive(Debug, Clone)]
pub struct TerminalBuilder {
    term_type: String,
    size: TerminalSize,
    attributes: Attributes,
    input_capacity: usize,
}

impl Default for TerminalBuilder {
    fn default() -> Self {
        Self {
            term_type: "xterm".to_string(),
            size: TerminalSize::default(),
            attributes: Attributes::default(),
            input_capacity: INPUT_CAPACITY,
        }
    }
}

impl TerminalBuilder {
    /// Create a builder with an xterm-compatible 80x24 cooked terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the terminal type (the `TERM` value the peer sent).
    #[must_use]
    pub fn term_type(mut self, term_type: impl Into<String>) -> Self {
        self.term_type = term_type.into();
        self
    }

    /// Set the initial window size.
    #[must_use]
    pub const fn size(mut self, size: TerminalSize) -> Self {
        self.size = size;
        self
    }

    /// Set the initial attributes.
    #[must_use]
    pub const fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the input pipe capacity.
    #[must_use]
    pub const fn input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity;
        self
    }

    /// Build the terminal and the handle used to drive it.
    pub fn build(self) -> Result<(Terminal, TerminalRemote)> {
        let size = self.size.validate()?;
        let (input_writer, input_reader) = tokio::io::duplex(self.input_capacity.max(1));
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (size_tx, size_rx) = watch::channel(size);
        let caps = Capabilities::for_term(&self.term_type);

        let terminal = Terminal {
            term_type: self.term_type,
            caps,
            attributes: self.attributes,
            size: size_rx,
            input: NonBlockingReader::new(input_reader),
            output: output_tx,
            pending: Vec::new(),
            last_byte: None,
        };
        let remote = TerminalRemote {
            input: Some(input_writer),
            output: output_rx,
            size: size_tx,
        };
        Ok((terminal, remote))
    }
}

/// Session-side handle to a remote terminal.
///
/// Output written through [`Write`] is buffered until [`Write::flush`].
/// When output post-processing is enabled in the attributes, bare `\n`
/// bytes are expanded to `\r\n`.
pub struct Terminal {
    term_type: String,
    caps: Capabilities,
    attributes: Attributes,
    size: watch::Receiver<TerminalSize>,
    input: NonBlockingReader<DuplexStream>,
    output: mpsc::UnboundedSender<Bytes>,
    pending: Vec<u8>,
    last_byte: Option<u8>,
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("term_type", &self.term_type)
            .field("size", &*self.size.borrow())
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Terminal {
    /// Start building a terminal.
    #[must_use]
    pub fn builder() -> TerminalBuilder {
        TerminalBuilder::new()
    }

    /// The terminal type.
    #[must_use]
    pub fn term_type(&self) -> &str {
        &self.term_type
    }

    /// The capability table resolved for the terminal type.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// The current window size.
    #[must_use]
    pub fn size(&self) -> TerminalSize {
        *self.size.borrow()
    }

    /// Subscribe to window size changes.
    ///
    /// The returned receiver only reports changes made after this call.
    /// Dropping it unsubscribes.
    #[must_use]
    pub fn subscribe_resize(&self) -> watch::Receiver<TerminalSize> {
        let mut rx = self.size.clone();
        rx.borrow_and_update();
        rx
    }

    /// The current attributes.
    #[must_use]
    pub const fn attributes(&self) -> Attributes {
        self.attributes
    }

    /// Replace the attributes.
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    /// Switch to raw mode, returning the attributes in effect before.
    pub fn enter_raw_mode(&mut self) -> Attributes {
        let previous = self.attributes;
        self.attributes = previous.raw();
        tracing::trace!(term = %self.term_type, "entered raw mode");
        previous
    }

    /// Write a capability code. Unsupported capabilities write nothing.
    pub fn puts(&mut self, cap: Capability) -> io::Result<bool> {
        let caps = std::mem::take(&mut self.caps);
        let written = caps.emit(self, cap);
        self.caps = caps;
        written
    }

    /// The input reader.
    pub const fn reader(&mut self) -> &mut NonBlockingReader<DuplexStream> {
        &mut self.input
    }

    /// Whether the peer has stopped accepting output.
    #[must_use]
    pub fn is_output_closed(&self) -> bool {
        self.output.is_closed()
    }

    fn push_output(&mut self, buf: &[u8]) {
        let expand = self.attributes.translates_newlines();
        for &byte in buf {
            if expand && byte == b'\n' && self.last_byte != Some(b'\r') {
                self.pending.push(b'\r');
            }
            self.pending.push(byte);
            self.last_byte = Some(byte);
        }
    }
}

impl Write for Terminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.output.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                TermError::OutputClosed,
            ));
        }
        self.push_output(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::take(&mut self.pending));
        self.output
            .send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, TermError::OutputClosed))
    }
}

/// Transport-side handle to a [`Terminal`].
///
/// Feeds keystrokes, reports window size changes and collects output.
#[derive(Debug)]
pub struct TerminalRemote {
    input: Option<DuplexStream>,
    output: mpsc::UnboundedReceiver<Bytes>,
    size: watch::Sender<TerminalSize>,
}

impl TerminalRemote {
    /// Send keystrokes to the terminal.
    pub async fn feed(&mut self, data: &[u8]) -> Result<()> {
        match self.input.as_mut() {
            Some(input) => {
                input.write_all(data).await?;
                Ok(())
            }
            None => Err(TermError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "terminal input already closed",
            ))),
        }
    }

    /// Report a new window size. A zero-column size is rejected.
    pub fn resize(&self, size: TerminalSize) -> Result<()> {
        let size = size.validate()?;
        self.size.send_replace(size);
        Ok(())
    }

    /// Signal end of input. The terminal sees end of stream once buffered
    /// bytes are consumed.
    pub fn close_input(&mut self) {
        self.input = None;
    }

    /// Collect all output flushed so far, without waiting.
    pub fn drain_output(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(chunk) = self.output.try_recv() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    /// Split into input writer, output receiver and size sender, for
    /// transports that drive each side from a different task.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Option<DuplexStream>,
        mpsc::UnboundedReceiver<Bytes>,
        watch::Sender<TerminalSize>,
    ) {
        (self.input, self.output, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Peek;

    #[tokio::test]
    async fn output_flushes_to_remote() {
        let (mut term, mut remote) = Terminal::builder().build().unwrap();
        write!(term, "hello").unwrap();
        assert!(remote.drain_output().is_empty());
        term.flush().unwrap();
        assert_eq!(remote.drain_output(), b"hello");
    }

    #[tokio::test]
    async fn newlines_expanded_when_post_processing() {
        let (mut term, mut remote) = Terminal::builder().build().unwrap();
        term.write_all(b"a\nb\r\nc").unwrap();
        term.flush().unwrap();
        assert_eq!(remote.drain_output(), b"a\r\nb\r\nc");
    }

    #[tokio::test]
    async fn newlines_untouched_without_onlcr() {
        let (mut term, mut remote) = Terminal::builder()
            .attributes(Attributes::empty())
            .build()
            .unwrap();
        term.write_all(b"a\nb").unwrap();
        term.flush().unwrap();
        assert_eq!(remote.drain_output(), b"a\nb");
    }

    #[tokio::test]
    async fn input_reaches_reader() {
        let (mut term, mut remote) = Terminal::builder().build().unwrap();
        remote.feed(b"x").await.unwrap();
        assert_eq!(term.reader().peek().await.unwrap(), Peek::Byte(b'x'));
        remote.close_input();
        assert_eq!(term.reader().read_byte().await.unwrap(), Some(b'x'));
        assert_eq!(term.reader().read_byte().await.unwrap(), None);
    }

    #[tokio::test]
    async fn resize_notifies_subscribers() {
        let (term, remote) = Terminal::builder().build().unwrap();
        let mut rx = term.subscribe_resize();
        assert!(!rx.has_changed().unwrap());
        remote.resize(TerminalSize::new(120, 40)).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), TerminalSize::new(120, 40));
        assert_eq!(term.size(), TerminalSize::new(120, 40));
        assert!(remote.resize(TerminalSize::new(0, 40)).is_err());
    }

    #[tokio::test]
    async fn raw_mode_round_trip() {
        let (mut term, _remote) = Terminal::builder().build().unwrap();
        let saved = term.enter_raw_mode();
        assert!(term.attributes().is_raw());
        term.set_attributes(saved);
        assert_eq!(term.attributes(), Attributes::default());
    }

    #[tokio::test]
    async fn capabilities_follow_term_type() {
        let (mut term, mut remote) = Terminal::builder().term_type("dumb").build().unwrap();
        assert!(!term.puts(Capability::EnterCaMode).unwrap());
        term.flush().unwrap();
        assert!(remote.drain_output().is_empty());
    }

    #[tokio::test]
    async fn write_fails_once_remote_dropped() {
        let (mut term, remote) = Terminal::builder().build().unwrap();
        drop(remote);
        assert!(term.is_output_closed());
        let err = term.write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
