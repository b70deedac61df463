//! End-to-end tests of the command loop over an in-memory terminal.

use std::sync::Arc;

use shell_term::{Terminal, TerminalRemote, TerminalSize};
use ssh_shell::auth::{Authentication, PasswordAuthenticator, UserStore};
use ssh_shell::config::{EndpointConfig, ShellConfig};
use ssh_shell::endpoints::{audit, ids};
use ssh_shell::{SessionContext, Shell, ShellServices};

fn session(config: ShellConfig, auth: Option<Authentication>) -> (Shell, SessionContext, TerminalRemote) {
    let services = Arc::new(ShellServices::builder(config).build());
    let (term, remote) = Terminal::builder()
        .size(TerminalSize::new(120, 40))
        .build()
        .unwrap();
    let ctx = SessionContext::new(1, term, services.shared_config())
        .with_authentication(auth.map(Arc::new));
    (Shell::new(services), ctx, remote)
}

fn output(remote: &mut TerminalRemote) -> String {
    String::from_utf8(remote.drain_output()).unwrap()
}

#[tokio::test]
async fn help_then_exit() {
    let (shell, mut ctx, mut remote) = session(ShellConfig::default(), None);
    remote.feed(b"help\rexit\r").await.unwrap();
    shell.run(&mut ctx).await.unwrap();

    let out = output(&mut remote);
    assert!(out.contains("AVAILABLE COMMANDS"));
    assert!(out.contains("Built-In Commands"));
    assert!(out.contains("Actuator Commands"));
    assert!(out.contains("Type `help <command>` to learn more."));
    assert!(ctx.exit_requested());
    assert_eq!(ctx.history(), ["help".to_string(), "exit".to_string()]);
}

#[tokio::test]
async fn end_of_input_ends_the_loop() {
    let (shell, mut ctx, mut remote) = session(ShellConfig::default(), None);
    remote.feed(b"info\r").await.unwrap();
    remote.close_input();
    shell.run(&mut ctx).await.unwrap();
    assert!(!ctx.exit_requested());
    assert!(output(&mut remote).contains("\"build\""));
}

#[tokio::test]
async fn cancelled_session_stops_reading() {
    let (shell, mut ctx, _remote) = session(ShellConfig::default(), None);
    ctx.cancel_token().cancel();
    shell.run(&mut ctx).await.unwrap();
    assert!(ctx.history().is_empty());
}

#[tokio::test]
async fn errors_do_not_end_the_loop() {
    let (shell, mut ctx, mut remote) = session(ShellConfig::default(), None);
    remote.feed(b"nope\rhealth --bogus\rloggers -a get\rquit\r").await.unwrap();
    shell.run(&mut ctx).await.unwrap();

    let out = output(&mut remote);
    assert!(out.contains("Command 'nope' not found"));
    assert!(out.contains("Unknown option '--bogus'"), "{out:?}");
    assert!(ctx.exit_requested());

    let events = shell.services().audit().events(None, Some(audit::COMMAND));
    // Only commands that ran are audited.
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data["command"], "loggers");
    assert_eq!(events[0].data["status"], "failure");
    assert_eq!(events[1].data["status"], "success");
}

fn shutdown_enabled() -> ShellConfig {
    let mut config = ShellConfig::default();
    config
        .endpoints
        .insert(ids::SHUTDOWN.to_string(), EndpointConfig { enabled: Some(true) });
    config
}

#[tokio::test]
async fn shutdown_requires_confirmation() {
    let (shell, mut ctx, mut remote) = session(shutdown_enabled(), None);
    remote.feed(b"shutdown\rn\rexit\r").await.unwrap();
    shell.run(&mut ctx).await.unwrap();
    let out = output(&mut remote);
    assert!(out.contains("Are you sure you want to shutdown application ? [y/N]"));
    assert!(out.contains("Aborting shutdown"));
    assert!(!shell.services().shutdown_token().is_cancelled());
}

#[tokio::test]
async fn confirmed_shutdown_cancels_server() {
    let (shell, mut ctx, mut remote) = session(shutdown_enabled(), None);
    remote.feed(b"shutdown\rY\rexit\r").await.unwrap();
    shell.run(&mut ctx).await.unwrap();
    assert!(output(&mut remote).contains("Shutting down application..."));
    assert!(shell.services().shutdown_token().is_cancelled());
}

#[tokio::test]
async fn shutdown_disabled_by_default() {
    let (shell, mut ctx, _remote) = session(ShellConfig::default(), None);
    let err = shell.execute_line(&mut ctx, "shutdown").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Command 'shutdown' exists but is not currently available because endpoint 'shutdown' \
         deactivated (please check property 'endpoints.shutdown.enabled')"
    );
}

#[tokio::test]
async fn loggers_configure_and_get() {
    let (shell, mut ctx, _remote) = session(ShellConfig::default(), None);
    let out = shell
        .execute_line(&mut ctx, "loggers -a conf -n ssh_shell -l debug")
        .await
        .unwrap();
    assert_eq!(out.as_deref(), Some("Logger named [ssh_shell] now configured to level [DEBUG]"));

    let out = shell
        .execute_line(&mut ctx, "loggers --action get --name ssh_shell::server")
        .await
        .unwrap();
    assert_eq!(
        out.as_deref(),
        Some("Logger named [ssh_shell::server] : [configured: none, effective: DEBUG]")
    );
    assert_eq!(
        shell.services().log_levels().directives(),
        "info,ssh_shell=debug"
    );

    let err = shell.execute_line(&mut ctx, "loggers -a get").await.unwrap_err();
    assert_eq!(err.to_string(), "Logger name is mandatory for 'get' action");
}

#[tokio::test]
async fn metrics_lookup() {
    let (shell, mut ctx, _remote) = session(ShellConfig::default(), None);
    shell.execute_line(&mut ctx, "info").await.unwrap();
    let out = shell
        .execute_line(&mut ctx, "metrics -n ssh.commands -t command=info")
        .await
        .unwrap()
        .unwrap();
    assert!(out.contains("\"name\": \"ssh.commands\""), "{out}");

    let err = shell
        .execute_line(&mut ctx, "metrics -n does.not.exist")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No result for metrics name: does.not.exist");

    let err = shell
        .execute_line(&mut ctx, "metrics -n does.not.exist -t command=info")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No result for metrics name: does.not.exist and tags: command=info"
    );
}

#[tokio::test(start_paused = true)]
async fn watch_renders_until_quit() {
    let (shell, mut ctx, mut remote) = session(ShellConfig::default(), None);
    remote.feed(b"watch health\rqexit\r").await.unwrap();
    shell.run(&mut ctx).await.unwrap();

    let out = output(&mut remote);
    assert!(out.contains("Every 1000ms: health"), "{out:?}");
    assert!(out.contains("q: quit, +/-: change delay"));
    assert!(out.contains("\"status\": \"UP\""));
    assert!(out.contains("\x1b[?1049h") && out.contains("\x1b[?1049l"));
    assert!(ctx.exit_requested());
    assert!(!ctx.terminal().attributes().is_raw());
}

#[tokio::test(start_paused = true)]
async fn watch_inline_with_delay() {
    let (shell, mut ctx, mut remote) = session(ShellConfig::default(), None);
    remote.feed(b"watch -d 3000 --inline info\rq").await.unwrap();
    remote.close_input();
    shell.run(&mut ctx).await.unwrap();

    let out = output(&mut remote);
    assert!(out.contains("Every 3000ms: info"));
    assert!(!out.contains("\x1b[?1049h"));
}

#[tokio::test]
async fn watch_rejects_other_commands() {
    let (shell, mut ctx, _remote) = session(shutdown_enabled(), None);
    for line in ["watch help", "watch shutdown"] {
        let err = shell.execute_line(&mut ctx, line).await.unwrap_err();
        assert!(err.to_string().ends_with("cannot be watched"), "{err}");
    }
    let err = shell.execute_line(&mut ctx, "watch nope").await.unwrap_err();
    assert!(err.to_string().starts_with("Command 'nope' not found"));
    let err = shell.execute_line(&mut ctx, "watch").await.unwrap_err();
    assert_eq!(err.to_string(), "Missing command to watch");
}

fn users_config() -> ShellConfig {
    let mut config = ShellConfig::default();
    config.actuator.authorized_roles = vec!["ADMIN".to_string()];
    config
}

fn login(name: &str, roles: &[&str]) -> Authentication {
    UserStore::new()
        .with_user(name, "pw", roles)
        .authenticate(name, "pw", None)
        .unwrap()
}

#[tokio::test]
async fn roles_gate_actuator_commands() {
    let (shell, mut ctx, _remote) = session(users_config(), Some(login("admin", &["ADMIN"])));
    assert!(shell.execute_line(&mut ctx, "health").await.is_ok());

    let (shell, mut ctx, _remote) = session(users_config(), Some(login("bob", &["USER"])));
    let err = shell.execute_line(&mut ctx, "health").await.unwrap_err();
    assert!(err.to_string().ends_with("actuator commands are forbidden for current user"));
    // info is not role-checked
    assert!(shell.execute_line(&mut ctx, "info").await.is_ok());

    let help = shell.execute_line(&mut ctx, "help").await.unwrap().unwrap();
    assert!(help.contains("      * health: Display health endpoint."));
    assert!(help.contains("        info: Display info endpoint."));
    assert!(help.contains("Commands marked with (*) are currently unavailable."));

    let events = shell.services().audit().events(Some("bob"), Some(audit::COMMAND));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn excluded_commands_explain_why() {
    let mut config = ShellConfig::default();
    config.actuator.excludes = vec![ids::ENV.to_string()];
    let (shell, mut ctx, _remote) = session(config, None);
    let text = shell.execute_line(&mut ctx, "help env").await.unwrap().unwrap();
    assert!(text.ends_with(
        "This command is currently not available because command is present in exclusion \
         (please check property 'actuator.excludes')."
    ));
}
