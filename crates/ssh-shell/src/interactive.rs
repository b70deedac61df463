//! Auto-refreshing interactive views.
//!
//! [`run_interactive`] repeatedly asks a [`ContentProducer`] for lines and
//! renders them in place, one frame per tick, until the user presses an
//! exit key, input ends, or the session is cancelled. The refresh delay can
//! be changed with key bindings while the view runs.
//!
//! Ticks are aligned on multiples of the delay since the loop started, so
//! slow frames do not accumulate drift.
//!
//! # Example
//!
//! ```ignore
//! use ssh_shell::interactive::{run_interactive, InteractiveOptions};
//! use shell_term::StyledLine;
//!
//! let mut producer = |size, delay| Ok(vec![StyledLine::plain(format!("{size:?} every {delay:?}"))]);
//! let result = run_interactive(&mut term, &cancel, &mut producer, InteractiveOptions::new()).await?;
//! ```

use std::io::Write;
use std::time::Duration;

use shell_term::{
    Attributes, BindingReader, Capability, Display, KeyMap, Peek, StyledLine, Terminal,
    TerminalSize,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Smallest allowed refresh delay.
pub const MIN_DELAY: Duration = Duration::from_millis(1000);

/// How much one key press changes the delay.
pub const DELAY_STEP: Duration = Duration::from_millis(1000);

/// Operations bound to keys while a view runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Leave the view.
    Exit,
    /// Refresh less often.
    IncreaseDelay,
    /// Refresh more often.
    DecreaseDelay,
}

/// The bindings used by [`run_interactive`].
#[must_use]
pub fn default_keymap() -> KeyMap<Operation> {
    let mut keys = KeyMap::new();
    keys.bind(Operation::Exit, ["q", ":q", "Q", ":Q"]);
    keys.bind(Operation::IncreaseDelay, ["+", "i", "p"]);
    keys.bind(Operation::DecreaseDelay, ["-", "d", "m"]);
    keys
}

/// Produces the lines of one frame.
///
/// Called once per tick and after every resize, with the tracked size and
/// the current delay. A failure ends the view and is returned to the caller
/// after the terminal has been restored.
pub trait ContentProducer {
    /// Lines to show for this frame.
    fn lines(&mut self, size: TerminalSize, delay: Duration) -> Result<Vec<StyledLine>>;
}

impl<F> ContentProducer for F
where
    F: FnMut(TerminalSize, Duration) -> Result<Vec<StyledLine>>,
{
    fn lines(&mut self, size: TerminalSize, delay: Duration) -> Result<Vec<StyledLine>> {
        self(size, delay)
    }
}

/// Options for [`run_interactive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractiveOptions {
    /// Initial refresh delay. Raised to [`MIN_DELAY`] when smaller.
    pub delay: Duration,
    /// Use the alternate screen with a hidden cursor.
    pub full_screen: bool,
    /// Size to render for instead of the live terminal columns.
    pub size: Option<TerminalSize>,
}

impl Default for InteractiveOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractiveOptions {
    /// One second refresh in full screen.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delay: MIN_DELAY,
            full_screen: true,
            size: None,
        }
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Render in the alternate screen or inline.
    #[must_use]
    pub const fn with_full_screen(mut self, full_screen: bool) -> Self {
        self.full_screen = full_screen;
        self
    }

    /// Render for a fixed size.
    #[must_use]
    pub const fn with_size(mut self, size: TerminalSize) -> Self {
        self.size = Some(size);
        self
    }
}

/// State shared by scheduled and resize-triggered renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshState {
    /// Current refresh delay.
    pub delay: Duration,
    /// Size frames are rendered for. `rows == 0` means no row budget.
    pub size: TerminalSize,
}

impl RefreshState {
    /// Start with `delay`, raised to [`MIN_DELAY`] when smaller.
    #[must_use]
    pub fn new(delay: Duration, size: TerminalSize) -> Self {
        Self {
            delay: delay.max(MIN_DELAY),
            size,
        }
    }

    /// Apply a delay operation. Returns `false` when it was rejected.
    ///
    /// The delay never drops below [`MIN_DELAY`].
    pub fn adjust_delay(&mut self, op: Operation) -> bool {
        match op {
            Operation::IncreaseDelay => {
                self.delay = self.delay.saturating_add(DELAY_STEP);
                tracing::debug!(delay_ms = self.delay.as_millis(), "refresh delay increased");
                true
            }
            Operation::DecreaseDelay => match self.delay.checked_sub(DELAY_STEP) {
                Some(delay) if delay >= MIN_DELAY => {
                    self.delay = delay;
                    tracing::debug!(delay_ms = delay.as_millis(), "refresh delay decreased");
                    true
                }
                _ => {
                    tracing::warn!(
                        delay_ms = self.delay.as_millis(),
                        min_ms = MIN_DELAY.as_millis(),
                        "cannot decrease refresh delay below minimum"
                    );
                    false
                }
            },
            Operation::Exit => false,
        }
    }
}

/// Reason an interactive view ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveEndReason {
    /// An exit key was pressed.
    Key,
    /// Terminal input ended.
    EndOfInput,
    /// The session was cancelled.
    Interrupted,
}

/// Result of an interactive view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractiveResult {
    /// How the view ended.
    pub reason: InteractiveEndReason,
    /// Frames rendered, including resize renders.
    pub frames: u64,
    /// Delay in effect when the view ended.
    pub delay: Duration,
}

/// Puts the terminal back the way it was, however the loop ends.
struct Restore<'a> {
    terminal: &'a mut Terminal,
    saved: Attributes,
    full_screen: bool,
    lines: usize,
    resize: Option<watch::Receiver<TerminalSize>>,
}

impl Restore<'_> {
    fn finish(&mut self) -> std::io::Result<()> {
        if self.full_screen {
            for cap in [
                Capability::ExitCaMode,
                Capability::KeypadLocal,
                Capability::CursorVisible,
            ] {
                self.terminal.puts(cap)?;
            }
        } else {
            for _ in 0..self.lines {
                self.terminal.write_all(b"\n")?;
            }
        }
        self.terminal.flush()
    }
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        self.terminal.set_attributes(self.saved);
        self.resize = None;
        if let Err(e) = self.finish() {
            tracing::debug!(error = %e, "failed to restore terminal");
        }
    }
}

enum Wake {
    Interrupted,
    Resized(TerminalSize),
    Input(Peek),
}

/// Run an auto-refreshing view until exit.
///
/// The terminal is switched to raw mode and, in full screen, to the
/// alternate screen with keypad transmit mode and a hidden cursor. On every
/// way out (exit key, end of input, cancellation, producer or I/O failure,
/// or the future being dropped) the attributes are restored, the resize
/// subscription is dropped and either the screen modes are reversed or, for
/// inline views, one blank line is written per line of the last frame.
///
/// Cancellation is never reported as an error.
pub async fn run_interactive<P>(
    terminal: &mut Terminal,
    cancel: &CancellationToken,
    producer: &mut P,
    options: InteractiveOptions,
) -> Result<InteractiveResult>
where
    P: ContentProducer + ?Sized,
{
    let saved = terminal.attributes();
    let size = options
        .size
        .unwrap_or_else(|| TerminalSize::new(terminal.size().cols, 0));
    let mut state = RefreshState::new(options.delay, size);
    let keys = default_keymap();
    let mut bindings = BindingReader::new();
    let mut display = Display::new(terminal.capabilities(), options.full_screen);
    let resize = terminal.subscribe_resize();

    let mut guard = Restore {
        terminal,
        saved,
        full_screen: options.full_screen,
        lines: 0,
        resize: Some(resize),
    };
    guard.terminal.enter_raw_mode();
    if options.full_screen {
        guard.terminal.puts(Capability::EnterCaMode)?;
        guard.terminal.puts(Capability::KeypadXmit)?;
        guard.terminal.puts(Capability::CursorInvisible)?;
        guard.terminal.flush()?;
    }
    tracing::debug!(
        delay_ms = state.delay.as_millis(),
        full_screen = options.full_screen,
        "interactive view started"
    );

    let start = Instant::now();
    let mut frames = 0_u64;
    let reason = 'ticks: loop {
        render(&mut guard, &mut display, producer, &mut state)?;
        frames += 1;
        if cancel.is_cancelled() {
            break InteractiveEndReason::Interrupted;
        }

        let deadline = next_tick(start, Instant::now(), state.delay);
        loop {
            let wake = tokio::select! {
                biased;
                () = cancel.cancelled() => Wake::Interrupted,
                size = next_resize(&mut guard.resize) => Wake::Resized(size),
                peek = guard.terminal.reader().peek_until(deadline) => Wake::Input(peek?),
            };
            match wake {
                Wake::Interrupted => break 'ticks InteractiveEndReason::Interrupted,
                Wake::Resized(live) => {
                    let previous = state.size.cols;
                    state.size = TerminalSize::new(live.cols, state.size.rows);
                    if state.size.cols < previous {
                        display.clear();
                    }
                    tracing::trace!(cols = live.cols, "terminal resized");
                    render(&mut guard, &mut display, producer, &mut state)?;
                    frames += 1;
                }
                Wake::Input(Peek::Eof) => break 'ticks InteractiveEndReason::EndOfInput,
                Wake::Input(Peek::Expired) => break,
                Wake::Input(Peek::Byte(_)) => {
                    match bindings.read_binding(guard.terminal.reader(), &keys).await? {
                        Some(Operation::Exit) => break 'ticks InteractiveEndReason::Key,
                        Some(op) => {
                            state.adjust_delay(op);
                        }
                        None => {}
                    }
                    break;
                }
            }
        }
    };

    tracing::debug!(?reason, frames, "interactive view ended");
    Ok(InteractiveResult {
        reason,
        frames,
        delay: state.delay,
    })
}

fn render<P>(
    guard: &mut Restore<'_>,
    display: &mut Display,
    producer: &mut P,
    state: &mut RefreshState,
) -> Result<()>
where
    P: ContentProducer + ?Sized,
{
    display.resize(state.size.rows, state.size.cols);
    let lines = producer.lines(state.size, state.delay)?;
    display.update(&lines, 0, &mut *guard.terminal)?;
    guard.terminal.flush()?;
    guard.lines = lines.len();
    Ok(())
}

/// The first tick boundary strictly after `now`.
fn next_tick(start: Instant, now: Instant, delay: Duration) -> Instant {
    let delay_ms = delay.as_millis().max(1);
    let elapsed_ms = now.saturating_duration_since(start).as_millis();
    let offset_ms = (elapsed_ms / delay_ms + 1) * delay_ms;
    u64::try_from(offset_ms)
        .ok()
        .and_then(|ms| start.checked_add(Duration::from_millis(ms)))
        .unwrap_or(now + delay)
}

/// Wait for the next size change. Pending forever once unsubscribed or
/// when the sender is gone.
async fn next_resize(subscription: &mut Option<watch::Receiver<TerminalSize>>) -> TerminalSize {
    if let Some(rx) = subscription.as_mut() {
        if rx.changed().await.is_ok() {
            return *rx.borrow_and_update();
        }
    }
    *subscription = None;
    std::future::pending().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_align_to_start() {
        let start = Instant::now();
        let delay = Duration::from_millis(1000);
        assert_eq!(next_tick(start, start, delay), start + delay);
        assert_eq!(
            next_tick(start, start + Duration::from_millis(1200), delay),
            start + Duration::from_millis(2000)
        );
        assert_eq!(
            next_tick(start, start + Duration::from_millis(2000), delay),
            start + Duration::from_millis(3000)
        );
    }

    #[test]
    fn delay_floor() {
        let mut state = RefreshState::new(Duration::from_millis(10), TerminalSize::new(80, 0));
        assert_eq!(state.delay, MIN_DELAY);
        assert!(!state.adjust_delay(Operation::DecreaseDelay));
        assert_eq!(state.delay, MIN_DELAY);
        assert!(state.adjust_delay(Operation::IncreaseDelay));
        assert_eq!(state.delay, Duration::from_millis(2000));
        assert!(state.adjust_delay(Operation::DecreaseDelay));
        assert_eq!(state.delay, MIN_DELAY);
        assert!(!state.adjust_delay(Operation::Exit));
    }

    #[test]
    fn default_bindings() {
        let keys = default_keymap();
        for seq in ["q", ":q", "Q", ":Q"] {
            assert!(matches!(
                keys.lookup(seq.as_bytes()),
                shell_term::Lookup::Bound(Operation::Exit)
            ));
        }
        for seq in ["+", "i", "p"] {
            assert!(matches!(
                keys.lookup(seq.as_bytes()),
                shell_term::Lookup::Bound(Operation::IncreaseDelay)
            ));
        }
        for seq in ["-", "d", "m"] {
            assert!(matches!(
                keys.lookup(seq.as_bytes()),
                shell_term::Lookup::Bound(Operation::DecreaseDelay)
            ));
        }
        assert!(matches!(keys.lookup(b":"), shell_term::Lookup::Prefix));
    }
}
