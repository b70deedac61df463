//! Conveniences for command implementations.
//!
//! The string helpers ([`success`], [`warning`], ...) only build ANSI
//! strings. [`ShellHelper`] wraps the session context for everything that
//! talks to the user.

use shell_term::{Color, ReadLine, TerminalSize};

use crate::auth::{self, Authentication};
use crate::context::SessionContext;
use crate::error::Result;
use crate::interactive::{self, ContentProducer, InteractiveOptions, InteractiveResult};

pub use shell_term::{background_colored, colored};

/// `message` in green.
#[must_use]
pub fn success(message: &str) -> String {
    colored(message, Color::Green)
}

/// `message` in cyan.
#[must_use]
pub fn info(message: &str) -> String {
    colored(message, Color::Cyan)
}

/// `message` in yellow.
#[must_use]
pub fn warning(message: &str) -> String {
    colored(message, Color::Yellow)
}

/// `message` in red.
#[must_use]
pub fn error(message: &str) -> String {
    colored(message, Color::Red)
}

/// Session-bound helper for interactive commands.
#[derive(Debug)]
pub struct ShellHelper<'a> {
    ctx: &'a mut SessionContext,
}

impl<'a> ShellHelper<'a> {
    /// Wrap a session context.
    pub const fn new(ctx: &'a mut SessionContext) -> Self {
        Self { ctx }
    }

    /// Print a line, colored when `color` is given.
    pub fn print(&mut self, message: &str, color: Option<Color>) -> Result<()> {
        match color {
            Some(color) => self.ctx.println(&colored(message, color)),
            None => self.ctx.println(message),
        }
    }

    /// Print a green line.
    pub fn print_success(&mut self, message: &str) -> Result<()> {
        self.print(message, Some(Color::Green))
    }

    /// Print a cyan line.
    pub fn print_info(&mut self, message: &str) -> Result<()> {
        self.print(message, Some(Color::Cyan))
    }

    /// Print a yellow line.
    pub fn print_warning(&mut self, message: &str) -> Result<()> {
        self.print(message, Some(Color::Yellow))
    }

    /// Print a red line.
    pub fn print_error(&mut self, message: &str) -> Result<()> {
        self.print(message, Some(Color::Red))
    }

    /// Print `message` on its own line, if any, then read one line.
    ///
    /// An interrupted or ended read yields an empty answer.
    pub async fn read(&mut self, message: Option<&str>) -> Result<String> {
        if let Some(message) = message {
            self.ctx.println(message)?;
        }
        Ok(match self.ctx.read_line("").await? {
            ReadLine::Line(line) => line,
            ReadLine::Interrupted | ReadLine::Eof => String::new(),
        })
    }

    /// Ask for confirmation.
    ///
    /// The answer must equal one of `words`, or of the configured
    /// confirmation words when `words` is empty.
    pub async fn confirm(
        &mut self,
        message: &str,
        case_sensitive: bool,
        words: &[&str],
    ) -> Result<bool> {
        let answer = self.read(Some(message)).await?;
        let answer = answer.trim();
        let matches = |word: &str| {
            if case_sensitive {
                word == answer
            } else {
                word.eq_ignore_ascii_case(answer)
            }
        };
        Ok(if words.is_empty() {
            self.ctx.config().confirmation_words.iter().any(|w| matches(w))
        } else {
            words.iter().any(|w| matches(w))
        })
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.ctx.authentication()
    }

    /// Whether the session user holds one of `authorized_roles`.
    ///
    /// A session without authorities is not authorized.
    #[must_use]
    pub fn check_authorities(&self, authorized_roles: &[String]) -> bool {
        auth::check_authorities(
            authorized_roles,
            self.authentication().and_then(|a| a.authorities.as_deref()),
            false,
        )
    }

    /// The live terminal size.
    #[must_use]
    pub fn terminal_size(&self) -> TerminalSize {
        self.ctx.terminal_size()
    }

    /// A progress bar spanning the terminal width. Values above 100 are
    /// shown as 100.
    #[must_use]
    pub fn progress(&self, percentage: u32) -> String {
        let current = if percentage > 100 {
            tracing::warn!(percentage, "setting percentage to 100");
            100
        } else {
            percentage
        };
        self.progress_of(u64::from(current), 100)
    }

    /// A progress bar for `current` out of `total`, spanning the terminal
    /// width: `[====>    ]`.
    #[must_use]
    pub fn progress_of(&self, current: u64, total: u64) -> String {
        progress_bar(self.terminal_size().cols, current, total)
    }

    /// Run an auto-refreshing view on the session terminal.
    pub async fn interactive<P>(
        &mut self,
        producer: &mut P,
        options: InteractiveOptions,
    ) -> Result<InteractiveResult>
    where
        P: ContentProducer + ?Sized,
    {
        let cancel = self.ctx.cancel_token().clone();
        interactive::run_interactive(self.ctx.terminal_mut(), &cancel, producer, options).await
    }
}

fn progress_bar(cols: u16, current: u64, total: u64) -> String {
    let Some(max) = cols.checked_sub(3).map(usize::from) else {
        tracing::warn!(cols, "terminal is too small to print progress");
        return String::new();
    };
    if total == 0 {
        tracing::warn!("cannot print progress of an empty total");
        return String::new();
    }
    let ratio = current
        .min(total)
        .saturating_mul(u64::try_from(max).unwrap_or(u64::MAX))
        / total;
    let filled = usize::try_from(ratio).unwrap_or(max).min(max);
    format!("[{}>{}]", "=".repeat(filled), " ".repeat(max - filled))
}
