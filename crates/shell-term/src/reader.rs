//! Timed, buffered input reading and key binding decoding.
//!
//! [`NonBlockingReader`] buffers bytes read from the terminal's input stream
//! so that peeking can be abandoned at any point (for example when a
//! `select!` branch loses) without losing data. [`BindingReader`] turns the
//! buffered bytes into operations according to a [`KeyMap`].

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

use crate::keymap::{KeyMap, Lookup};

const READ_CHUNK: usize = 256;

/// Outcome of a timed peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peek {
    /// A byte is available. It has not been consumed.
    Byte(u8),
    /// No input arrived before the deadline.
    Expired,
    /// The input stream has ended.
    Eof,
}

/// Buffered reader with timed, cancel-safe peeks.
#[derive(Debug)]
pub struct NonBlockingReader<R> {
    inner: R,
    buffer: VecDeque<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> NonBlockingReader<R> {
    /// Wrap an input stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: VecDeque::new(),
            eof: false,
        }
    }

    /// Read one chunk from the underlying stream into the buffer.
    ///
    /// Cancel-safe: if the future is dropped before completing, no data has
    /// been taken from the stream.
    async fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk).await?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buffer.extend(&chunk[..n]);
        }
        Ok(())
    }

    fn buffered_peek(&self) -> Option<Peek> {
        if let Some(&byte) = self.buffer.front() {
            Some(Peek::Byte(byte))
        } else if self.eof {
            Some(Peek::Eof)
        } else {
            None
        }
    }

    /// Wait for a byte without consuming it.
    pub async fn peek(&mut self) -> io::Result<Peek> {
        loop {
            if let Some(peek) = self.buffered_peek() {
                return Ok(peek);
            }
            self.fill().await?;
        }
    }

    /// Wait until `deadline` for a byte without consuming it.
    pub async fn peek_until(&mut self, deadline: Instant) -> io::Result<Peek> {
        loop {
            if let Some(peek) = self.buffered_peek() {
                return Ok(peek);
            }
            match tokio::time::timeout_at(deadline, self.fill()).await {
                Ok(result) => result?,
                Err(_) => return Ok(Peek::Expired),
            }
        }
    }

    /// Wait up to `timeout` for a byte without consuming it.
    pub async fn peek_timeout(&mut self, timeout: Duration) -> io::Result<Peek> {
        self.peek_until(Instant::now() + timeout).await
    }

    /// Read one byte, waiting for it. Returns `None` at end of input.
    pub async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        match self.peek().await? {
            Peek::Byte(_) => Ok(self.buffer.pop_front()),
            Peek::Expired | Peek::Eof => Ok(None),
        }
    }

    /// Take one already-buffered byte, without waiting.
    pub fn try_read_byte(&mut self) -> Option<u8> {
        self.buffer.pop_front()
    }

    /// Number of buffered, unread bytes.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the stream has reported end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }
}

/// Decodes buffered input into key bindings.
///
/// The reader keeps the bytes of a partially typed sequence between calls,
/// so a multi-key binding such as `:q` can be completed across several
/// polls.
#[derive(Debug, Clone, Default)]
pub struct BindingReader {
    pending: Vec<u8>,
}

impl BindingReader {
    /// Create a binding reader with no pending input.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Bytes of the sequence typed so far.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Forget any partially typed sequence.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Consume the next buffered byte and try to resolve a binding.
    ///
    /// Meant to be called once a peek has reported a byte. Returns `None`
    /// when the input so far is only the start of a binding (the bytes stay
    /// pending) or when it matches nothing (leading bytes that cannot start
    /// a binding are discarded). An ambiguous sequence waits up to the
    /// keymap's ambiguous timeout for a byte that extends it.
    pub async fn read_binding<R, T>(
        &mut self,
        reader: &mut NonBlockingReader<R>,
        keys: &KeyMap<T>,
    ) -> io::Result<Option<T>>
    where
        R: AsyncRead + Unpin,
        T: Clone,
    {
        if let Some(byte) = reader.try_read_byte() {
            self.pending.push(byte);
        }
        while !self.pending.is_empty() {
            match keys.lookup(&self.pending) {
                Lookup::Bound(op) => {
                    let op = op.clone();
                    self.pending.clear();
                    return Ok(Some(op));
                }
                Lookup::Ambiguous(op) => {
                    let op = op.clone();
                    if let Peek::Byte(next) = reader.peek_timeout(keys.ambiguous_timeout()).await? {
                        let mut extended = self.pending.clone();
                        extended.push(next);
                        if !matches!(keys.lookup(&extended), Lookup::Unbound) {
                            reader.try_read_byte();
                            self.pending = extended;
                            continue;
                        }
                    }
                    self.pending.clear();
                    return Ok(Some(op));
                }
                Lookup::Prefix => return Ok(None),
                Lookup::Unbound => {
                    self.pending.remove(0);
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Exit,
        Faster,
        Word,
    }

    fn keys() -> KeyMap<Op> {
        let mut keys = KeyMap::new().with_ambiguous_timeout(Duration::from_millis(50));
        keys.bind(Op::Exit, ["q", ":q"]);
        keys.bind(Op::Faster, ["+"]);
        keys.bind(Op::Word, ["w", "wx"]);
        keys
    }

    #[tokio::test(start_paused = true)]
    async fn peek_expires_without_input() {
        let (_tx, rx) = tokio::io::duplex(64);
        let mut reader = NonBlockingReader::new(rx);
        let peek = reader.peek_timeout(Duration::from_millis(500)).await.unwrap();
        assert_eq!(peek, Peek::Expired);
    }

    #[tokio::test]
    async fn peek_does_not_consume() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"ab").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        assert_eq!(reader.peek().await.unwrap(), Peek::Byte(b'a'));
        assert_eq!(reader.peek().await.unwrap(), Peek::Byte(b'a'));
        assert_eq!(reader.read_byte().await.unwrap(), Some(b'a'));
        assert_eq!(reader.read_byte().await.unwrap(), Some(b'b'));
    }

    #[tokio::test]
    async fn eof_after_close() {
        let (tx, rx) = tokio::io::duplex(64);
        drop(tx);
        let mut reader = NonBlockingReader::new(rx);
        assert_eq!(
            reader.peek_timeout(Duration::from_secs(1)).await.unwrap(),
            Peek::Eof
        );
        assert!(reader.is_eof());
        assert_eq!(reader.read_byte().await.unwrap(), None);
    }

    #[tokio::test]
    async fn single_key_binding() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"+").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        let mut bindings = BindingReader::new();
        reader.peek().await.unwrap();
        let op = bindings.read_binding(&mut reader, &keys()).await.unwrap();
        assert_eq!(op, Some(Op::Faster));
    }

    #[tokio::test]
    async fn prefix_completes_across_calls() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b":q").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        let mut bindings = BindingReader::new();
        let keys = keys();
        reader.peek().await.unwrap();
        assert_eq!(bindings.read_binding(&mut reader, &keys).await.unwrap(), None);
        assert_eq!(bindings.pending(), b":");
        reader.peek().await.unwrap();
        assert_eq!(
            bindings.read_binding(&mut reader, &keys).await.unwrap(),
            Some(Op::Exit)
        );
        assert!(bindings.pending().is_empty());
    }

    #[tokio::test]
    async fn unbound_lead_byte_dropped() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"z").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        let mut bindings = BindingReader::new();
        reader.peek().await.unwrap();
        assert_eq!(bindings.read_binding(&mut reader, &keys()).await.unwrap(), None);
        assert!(bindings.pending().is_empty());
        assert_eq!(reader.buffered(), 0);
    }

    #[tokio::test]
    async fn broken_prefix_keeps_remainder() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b":+").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        let mut bindings = BindingReader::new();
        let keys = keys();
        reader.peek().await.unwrap();
        assert_eq!(bindings.read_binding(&mut reader, &keys).await.unwrap(), None);
        reader.peek().await.unwrap();
        assert_eq!(
            bindings.read_binding(&mut reader, &keys).await.unwrap(),
            Some(Op::Faster)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ambiguous_resolves_on_timeout() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"w").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        let mut bindings = BindingReader::new();
        reader.peek().await.unwrap();
        assert_eq!(
            bindings.read_binding(&mut reader, &keys()).await.unwrap(),
            Some(Op::Word)
        );
    }

    #[tokio::test]
    async fn ambiguous_extends_when_possible() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"wxq").await.unwrap();
        let mut reader = NonBlockingReader::new(rx);
        let mut bindings = BindingReader::new();
        let keys = keys();
        reader.peek().await.unwrap();
        assert_eq!(
            bindings.read_binding(&mut reader, &keys).await.unwrap(),
            Some(Op::Word)
        );
        assert_eq!(reader.buffered(), 1);
        reader.peek().await.unwrap();
        assert_eq!(
            bindings.read_binding(&mut reader, &keys).await.unwrap(),
            Some(Op::Exit)
        );
    }
}
