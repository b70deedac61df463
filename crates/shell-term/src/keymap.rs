//! Key sequence bindings.

use std::collections::BTreeMap;
use std::ops::Bound as RangeBound;
use std::time::Duration;

/// Default time to wait for the rest of an ambiguous sequence.
pub const DEFAULT_AMBIGUOUS_TIMEOUT: Duration = Duration::from_millis(1000);

/// Result of looking up a byte sequence in a [`KeyMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a, T> {
    /// The sequence is bound and no longer binding starts with it.
    Bound(&'a T),
    /// The sequence is bound, but longer bindings start with it too.
    Ambiguous(&'a T),
    /// The sequence is not bound, but is the start of a longer binding.
    Prefix,
    /// Nothing is bound to the sequence or any extension of it.
    Unbound,
}

/// Mapping from raw key sequences to operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap<T> {
    bindings: BTreeMap<Vec<u8>, T>,
    ambiguous_timeout: Duration,
}

impl<T> Default for KeyMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyMap<T> {
    /// Create an empty keymap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
            ambiguous_timeout: DEFAULT_AMBIGUOUS_TIMEOUT,
        }
    }

    /// Set how long to wait before resolving an ambiguous sequence to its
    /// shorter binding.
    #[must_use]
    pub const fn with_ambiguous_timeout(mut self, timeout: Duration) -> Self {
        self.ambiguous_timeout = timeout;
        self
    }

    /// The ambiguous-sequence timeout.
    #[must_use]
    pub const fn ambiguous_timeout(&self) -> Duration {
        self.ambiguous_timeout
    }

    /// Number of bound sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no sequence is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Look up a byte sequence.
    #[must_use]
    pub fn lookup(&self, seq: &[u8]) -> Lookup<'_, T> {
        let longer = self
            .bindings
            .range::<[u8], _>((RangeBound::Excluded(seq), RangeBound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(seq));
        match (self.bindings.get(seq), longer) {
            (Some(op), false) => Lookup::Bound(op),
            (Some(op), true) => Lookup::Ambiguous(op),
            (None, true) => Lookup::Prefix,
            (None, false) => Lookup::Unbound,
        }
    }
}

impl<T: Clone> KeyMap<T> {
    /// Bind `op` to each of `sequences`, replacing earlier bindings.
    /// Empty sequences are ignored.
    pub fn bind<I, S>(&mut self, op: T, sequences: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        for seq in sequences {
            let seq = seq.as_ref();
            if !seq.is_empty() {
                self.bindings.insert(seq.to_vec(), op.clone());
            }
        }
    }

    /// Remove the binding for a sequence.
    pub fn unbind(&mut self, seq: impl AsRef<[u8]>) -> Option<T> {
        self.bindings.remove(seq.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Quit,
        Up,
        Word,
    }

    fn keymap() -> KeyMap<Op> {
        let mut keys = KeyMap::new();
        keys.bind(Op::Quit, ["q", ":q"]);
        keys.bind(Op::Up, [b"\x1b[A".as_slice()]);
        keys.bind(Op::Word, ["w", "ww"]);
        keys
    }

    #[test]
    fn exact_binding() {
        let keys = keymap();
        assert_eq!(keys.lookup(b"q"), Lookup::Bound(&Op::Quit));
        assert_eq!(keys.lookup(b":q"), Lookup::Bound(&Op::Quit));
        assert_eq!(keys.lookup(b"\x1b[A"), Lookup::Bound(&Op::Up));
    }

    #[test]
    fn prefixes() {
        let keys = keymap();
        assert_eq!(keys.lookup(b":"), Lookup::Prefix);
        assert_eq!(keys.lookup(b"\x1b"), Lookup::Prefix);
        assert_eq!(keys.lookup(b"\x1b["), Lookup::Prefix);
    }

    #[test]
    fn ambiguous_binding() {
        let keys = keymap();
        assert_eq!(keys.lookup(b"w"), Lookup::Ambiguous(&Op::Word));
        assert_eq!(keys.lookup(b"ww"), Lookup::Bound(&Op::Word));
    }

    #[test]
    fn unbound() {
        let keys = keymap();
        assert_eq!(keys.lookup(b"x"), Lookup::Unbound);
        assert_eq!(keys.lookup(b":x"), Lookup::Unbound);
        assert_eq!(keys.lookup(b"qq"), Lookup::Unbound);
    }

    #[test]
    fn rebind_and_unbind() {
        let mut keys = keymap();
        keys.bind(Op::Up, ["q"]);
        assert_eq!(keys.lookup(b"q"), Lookup::Bound(&Op::Up));
        assert_eq!(keys.unbind("q"), Some(Op::Up));
        assert_eq!(keys.lookup(b"q"), Lookup::Unbound);
        assert_eq!(keys.len(), 4);
    }
}
