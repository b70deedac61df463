//! SSH server exposing the shell.
//!
//! Each connection gets a [`ConnectionHandler`]. A `shell` or `exec` request
//! on a session channel starts a task that owns the channel's
//! [`Terminal`]: keystrokes from the client are written to the terminal's
//! input, output chunks are pumped back to the channel in order, and window
//! changes are forwarded to the terminal's resize channel. When the task
//! ends, the channel receives the exit status, EOF and close, in that order.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use russh::keys::{PrivateKey, PublicKey};
use russh::server::{self, Auth, Handle, Msg, Server as _, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use serde_json::{Map, Value};
use shell_term::{Attributes, Terminal, TerminalSize};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::auth::{self, Authentication, PasswordAuthenticator};
use crate::context::SessionContext;
use crate::endpoints::{SessionInfo, audit, metrics};
use crate::error::{CommandError, Result, ShellError};
use crate::host_key;
use crate::services::ShellServices;
use crate::shell::Shell;

/// Exit status sent when a session fails.
const FAILURE_STATUS: u32 = 1;

/// The SSH server.
#[derive(Debug, Clone)]
pub struct SshShellServer {
    services: Arc<ShellServices>,
    shell: Shell,
    authenticator: Arc<dyn PasswordAuthenticator>,
}

impl SshShellServer {
    /// Create a server authenticating users as configured.
    #[must_use]
    pub fn new(services: Arc<ShellServices>) -> Self {
        let authenticator = auth::from_config(services.config());
        Self::with_authenticator(services, authenticator)
    }

    /// Create a server with a custom authenticator.
    #[must_use]
    pub fn with_authenticator(
        services: Arc<ShellServices>,
        authenticator: Arc<dyn PasswordAuthenticator>,
    ) -> Self {
        Self {
            shell: Shell::new(Arc::clone(&services)),
            services,
            authenticator,
        }
    }

    /// The shared services.
    #[must_use]
    pub fn services(&self) -> &ShellServices {
        &self.services
    }

    /// Build the russh configuration around `key`.
    #[must_use]
    pub fn ssh_config(&self, key: PrivateKey) -> server::Config {
        server::Config {
            keys: vec![key],
            inactivity_timeout: self.services.config().inactivity_timeout(),
            auth_rejection_time: Duration::from_secs(1),
            auth_rejection_time_initial: Some(Duration::ZERO),
            ..Default::default()
        }
    }

    /// Accept connections until the shutdown token is cancelled.
    pub async fn serve(mut self) -> Result<()> {
        let config = self.services.shared_config();
        let key = host_key::load_or_generate(&config.host_key_file).await?;
        let ssh_config = Arc::new(self.ssh_config(key));
        let shutdown = self.services.shutdown_token().clone();
        let address = format!("{}:{}", config.host, config.port);

        tracing::info!(address = %address, "ssh shell listening");
        tokio::select! {
            result = self.run_on_address(ssh_config, (config.host.as_str(), config.port)) => {
                result.map_err(|e| ShellError::io_context(format!("serving on {address}"), e))
            }
            () = shutdown.cancelled() => {
                tracing::info!(address = %address, "ssh shell stopped");
                Ok(())
            }
        }
    }
}

impl server::Server for SshShellServer {
    type Handler = ConnectionHandler;

    fn new_client(&mut self, peer: Option<SocketAddr>) -> ConnectionHandler {
        tracing::debug!(peer = ?peer, "new connection");
        ConnectionHandler {
            services: Arc::clone(&self.services),
            shell: self.shell.clone(),
            authenticator: Arc::clone(&self.authenticator),
            peer,
            auth: None,
            channels: HashMap::new(),
        }
    }

    fn handle_session_error(&mut self, error: ShellError) {
        tracing::warn!(error = %error, "ssh session error");
    }
}

/// State of one session channel.
#[derive(Debug, Default)]
struct ChannelState {
    term_type: Option<String>,
    size: Option<TerminalSize>,
    attributes: Option<Attributes>,
    input: Option<DuplexStream>,
    resize: Option<watch::Sender<TerminalSize>>,
    cancel: CancellationToken,
    started: bool,
}

/// Handles one client connection.
#[derive(Debug)]
pub struct ConnectionHandler {
    services: Arc<ShellServices>,
    shell: Shell,
    authenticator: Arc<dyn PasswordAuthenticator>,
    peer: Option<SocketAddr>,
    auth: Option<Arc<Authentication>>,
    channels: HashMap<ChannelId, ChannelState>,
}

impl ConnectionHandler {
    /// Check a password and record the outcome.
    fn check_password(&mut self, user: &str, password: &str) -> bool {
        let mut data = Map::new();
        if let Some(peer) = self.peer {
            data.insert("remoteAddress".to_string(), Value::String(peer.to_string()));
        }
        match self.authenticator.authenticate(user, password, self.peer) {
            Some(authentication) => {
                tracing::info!(user, peer = ?self.peer, "authenticated");
                self.services
                    .audit()
                    .record(user, audit::AUTHENTICATION_SUCCESS, data);
                self.auth = Some(Arc::new(authentication));
                true
            }
            None => {
                tracing::warn!(user, peer = ?self.peer, "authentication failed");
                self.services.metrics().counter(metrics::AUTH_FAILURES, &[]).inc();
                self.services
                    .audit()
                    .record(user, audit::AUTHENTICATION_FAILURE, data);
                false
            }
        }
    }

    fn start_session(&mut self, channel: ChannelId, command: Option<String>, handle: Handle) -> Result<()> {
        let state = self.channels.entry(channel).or_default();
        if state.started {
            return Err(CommandError::failed("a shell or command is already running on this channel").into());
        }
        let mut builder = Terminal::builder();
        if let Some(term_type) = &state.term_type {
            builder = builder.term_type(term_type.clone());
        }
        if let Some(size) = state.size {
            builder = builder.size(size);
        }
        if let Some(attributes) = state.attributes {
            builder = builder.attributes(attributes);
        }
        let (terminal, remote) = builder.build()?;
        let (input, output, resize) = remote.into_parts();
        state.input = input;
        state.resize = Some(resize);
        state.started = true;

        let id = self.services.sessions().next_id();
        let info = SessionInfo {
            id,
            user: self.auth.as_ref().map_or_else(String::new, |a| a.name.clone()),
            remote_addr: self.peer,
            term_type: terminal.term_type().to_string(),
            started_at: std::time::SystemTime::now(),
        };
        let ctx = SessionContext::new(id, terminal, self.services.shared_config())
            .with_authentication(self.auth.clone())
            .with_cancel(state.cancel.clone());
        let task = SessionTask {
            channel,
            handle,
            shell: self.shell.clone(),
            services: Arc::clone(&self.services),
            command,
        };
        tokio::spawn(task.run(ctx, info, output));
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        for state in self.channels.values() {
            state.cancel.cancel();
        }
    }
}

impl server::Handler for ConnectionHandler {
    type Error = ShellError;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth> {
        if self.check_password(user, password) {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn auth_publickey(&mut self, user: &str, _key: &PublicKey) -> Result<Auth> {
        tracing::debug!(user, "public key authentication is not supported");
        Ok(Auth::reject())
    }

    async fn channel_open_session(&mut self, channel: Channel<Msg>, _session: &mut Session) -> Result<bool> {
        tracing::debug!(channel = ?channel.id(), "session channel opened");
        self.channels.insert(channel.id(), ChannelState::default());
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<()> {
        let state = self.channels.entry(channel).or_default();
        state.term_type = Some(term.to_string());
        state.size = TerminalSize::from_wire(col_width, row_height).validate().ok();
        state.attributes = Some(Attributes::from_pty_modes(
            modes.iter().map(|(mode, value)| (*mode as u8, *value)),
        ));
        tracing::debug!(channel = ?channel, term, cols = col_width, rows = row_height, "pty requested");
        session.channel_success(channel)?;
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<()> {
        match self.start_session(channel, None, session.handle()) {
            Ok(()) => session.channel_success(channel)?,
            Err(e) => {
                tracing::warn!(channel = ?channel, error = %e, "cannot start shell");
                session.channel_failure(channel)?;
            }
        }
        Ok(())
    }

    async fn exec_request(&mut self, channel: ChannelId, data: &[u8], session: &mut Session) -> Result<()> {
        let line = String::from_utf8_lossy(data).into_owned();
        tracing::debug!(channel = ?channel, command = %line, "exec requested");
        match self.start_session(channel, Some(line), session.handle()) {
            Ok(()) => session.channel_success(channel)?,
            Err(e) => {
                tracing::warn!(channel = ?channel, error = %e, "cannot start command");
                session.channel_failure(channel)?;
            }
        }
        Ok(())
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], _session: &mut Session) -> Result<()> {
        let Some(state) = self.channels.get_mut(&channel) else {
            return Ok(());
        };
        if let Some(input) = state.input.as_mut() {
            if let Err(e) = input.write_all(data).await {
                tracing::debug!(channel = ?channel, error = %e, "terminal input closed");
                state.input = None;
            }
        }
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<()> {
        let Some(state) = self.channels.get_mut(&channel) else {
            return Ok(());
        };
        let Ok(size) = TerminalSize::from_wire(col_width, row_height).validate() else {
            tracing::debug!(channel = ?channel, cols = col_width, rows = row_height, "ignoring empty window size");
            return Ok(());
        };
        state.size = Some(size);
        if let Some(resize) = &state.resize {
            resize.send_replace(size);
        }
        Ok(())
    }

    async fn channel_eof(&mut self, channel: ChannelId, _session: &mut Session) -> Result<()> {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.input = None;
        }
        Ok(())
    }

    async fn channel_close(&mut self, channel: ChannelId, _session: &mut Session) -> Result<()> {
        if let Some(mut state) = self.channels.remove(&channel) {
            tracing::debug!(channel = ?channel, "channel closed");
            state.input = None;
            state.cancel.cancel();
        }
        Ok(())
    }
}

/// A running shell or command on one channel.
struct SessionTask {
    channel: ChannelId,
    handle: Handle,
    shell: Shell,
    services: Arc<ShellServices>,
    command: Option<String>,
}

impl SessionTask {
    async fn run(self, mut ctx: SessionContext, info: SessionInfo, output: mpsc::UnboundedReceiver<Bytes>) {
        let id = info.id;
        let pump = tokio::spawn(pump_output(self.handle.clone(), self.channel, output));

        tracing::info!(session = id, user = %info.user, peer = ?info.remote_addr, "session started");
        self.services.sessions().insert(info);
        self.services.metrics().counter(metrics::SESSIONS_OPENED, &[]).inc();
        let active = self.services.metrics().gauge(metrics::SESSIONS_ACTIVE, &[]);
        active.inc();

        let result = match &self.command {
            None => self.shell.run(&mut ctx).await.map(|()| 0),
            Some(line) => self.shell.run_command(&mut ctx, line).await,
        };
        let status = result.unwrap_or_else(|e| {
            if e.is_disconnect() {
                tracing::debug!(session = id, "client went away");
            } else {
                tracing::warn!(session = id, error = %e, "session failed");
            }
            FAILURE_STATUS
        });

        active.dec();
        self.services.sessions().remove(id);
        // Dropping the terminal ends the output stream once it is drained.
        drop(ctx);
        if let Err(e) = pump.await {
            tracing::warn!(session = id, error = %e, "output pump failed");
        }

        let channel = self.channel;
        if self.handle.exit_status_request(channel, status).await.is_err()
            || self.handle.eof(channel).await.is_err()
            || self.handle.close(channel).await.is_err()
        {
            tracing::debug!(session = id, "channel already closed");
        }
        tracing::info!(session = id, status, "session ended");
    }
}

async fn pump_output(handle: Handle, channel: ChannelId, mut output: mpsc::UnboundedReceiver<Bytes>) {
    while let Some(chunk) = output.recv().await {
        if handle.data(channel, CryptoVec::from_slice(&chunk)).await.is_err() {
            tracing::debug!(channel = ?channel, "channel closed, dropping output");
            break;
        }
    }
}
