//! Per-session state passed explicitly to commands and helpers.

use std::io::Write;
use std::sync::Arc;

use shell_term::{LineReader, ReadLine, Terminal, TerminalSize};
use tokio_util::sync::CancellationToken;

use crate::auth::Authentication;
use crate::config::ShellConfig;
use crate::error::Result;

/// Everything a command may touch while it runs for one SSH session.
///
/// The context owns the session's terminal, so whoever holds `&mut
/// SessionContext` is the only writer to it.
#[derive(Debug)]
pub struct SessionContext {
    id: u64,
    terminal: Terminal,
    line_reader: LineReader,
    auth: Option<Arc<Authentication>>,
    cancel: CancellationToken,
    config: Arc<ShellConfig>,
    exit_requested: bool,
}

impl SessionContext {
    /// Create a context for a session.
    #[must_use]
    pub fn new(id: u64, terminal: Terminal, config: Arc<ShellConfig>) -> Self {
        Self {
            id,
            terminal,
            line_reader: LineReader::with_history_size(config.history_size),
            auth: None,
            cancel: CancellationToken::new(),
            config,
            exit_requested: false,
        }
    }

    /// Attach the authenticated user.
    #[must_use]
    pub fn with_authentication(mut self, auth: Option<Arc<Authentication>>) -> Self {
        self.auth = auth;
        self
    }

    /// Use `cancel` as the session's interruption signal.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The session terminal.
    #[must_use]
    pub const fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// The session terminal, for writing.
    pub const fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.auth.as_deref()
    }

    /// Cancelled when the session ends.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The shell configuration.
    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Current terminal size.
    #[must_use]
    pub fn terminal_size(&self) -> TerminalSize {
        self.terminal.size()
    }

    /// Lines entered in this session, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        self.line_reader.history()
    }

    /// Print `prompt` and read one line.
    pub async fn read_line(&mut self, prompt: &str) -> Result<ReadLine> {
        Ok(self.line_reader.read_line(&mut self.terminal, prompt).await?)
    }

    /// Write `text` without a line terminator.
    pub fn print(&mut self, text: &str) -> Result<()> {
        self.terminal.write_all(text.as_bytes())?;
        self.terminal.flush()?;
        Ok(())
    }

    /// Write `text` followed by a new line.
    pub fn println(&mut self, text: &str) -> Result<()> {
        self.terminal.write_all(text.as_bytes())?;
        self.terminal.write_all(b"\r\n")?;
        self.terminal.flush()?;
        Ok(())
    }

    /// Ask the shell to end the session after the current command.
    pub const fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Whether [`request_exit`](Self::request_exit) was called.
    #[must_use]
    pub const fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shell_term::TerminalRemote;

    fn context() -> (SessionContext, TerminalRemote) {
        let (term, remote) = Terminal::builder().build().unwrap();
        (SessionContext::new(7, term, Arc::new(ShellConfig::default())), remote)
    }

    #[tokio::test]
    async fn println_ends_with_crlf() {
        let (mut ctx, mut remote) = context();
        ctx.println("hello").unwrap();
        assert_eq!(remote.drain_output(), b"hello\r\n");
    }

    #[tokio::test]
    async fn read_line_records_history() {
        let (mut ctx, mut remote) = context();
        remote.feed(b"health\r").await.unwrap();
        assert_eq!(ctx.read_line("> ").await.unwrap(), ReadLine::Line("health".into()));
        assert_eq!(ctx.history(), ["health".to_string()]);
    }

    #[test]
    fn exit_flag_and_auth() {
        let (term, _remote) = Terminal::builder().build().unwrap();
        let auth = Arc::new(Authentication::new("admin"));
        let mut ctx = SessionContext::new(1, term, Arc::new(ShellConfig::default()))
            .with_authentication(Some(auth));
        assert_eq!(ctx.authentication().map(|a| a.name.as_str()), Some("admin"));
        assert!(!ctx.exit_requested());
        ctx.request_exit();
        assert!(ctx.exit_requested());
        assert_eq!(ctx.id(), 1);
    }
}
