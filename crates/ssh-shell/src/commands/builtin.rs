//! Built-in commands.

use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Duration;

use futures::future::BoxFuture;
use shell_term::{Capability, Color, Style, StyledLine, TerminalSize};

use super::actuator::ActuatorKind;
use super::availability::actuator_availability;
use super::{Args, Availability, Call, Command, CommandOutput, OptionSpec};
use crate::auth::Authentication;
use crate::error::{CommandError, CommandResult, Result};
use crate::helper::ShellHelper;
use crate::interactive::{InteractiveOptions, MIN_DELAY};
use crate::services::ShellServices;

/// Lists commands, or describes one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Help;

impl Help {
    fn list(services: &ShellServices, auth: Option<&Authentication>) -> String {
        let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
        let mut any_unavailable = false;
        for command in services.commands().iter() {
            let available = command.availability(services, auth).is_available();
            any_unavailable |= !available;
            let marker = if available { "  " } else { "* " };
            let mut names = command.name().to_string();
            for alias in command.aliases() {
                let _ = write!(names, ", {alias}");
            }
            let line = format!("      {marker}{names}: {}", command.description());
            match groups.iter_mut().find(|(g, _)| *g == command.group()) {
                Some((_, lines)) => lines.push(line),
                None => groups.push((command.group(), vec![line])),
            }
        }

        let mut out = String::from("AVAILABLE COMMANDS\n");
        for (group, lines) in groups {
            let _ = write!(out, "\n{group}\n");
            for line in lines {
                let _ = writeln!(out, "{line}");
            }
        }
        if any_unavailable {
            out.push_str("\nCommands marked with (*) are currently unavailable.");
        }
        out.push_str("\nType `help <command>` to learn more.");
        out
    }

    fn describe(
        name: &str,
        services: &ShellServices,
        auth: Option<&Authentication>,
    ) -> CommandResult<String> {
        let command = services
            .commands()
            .get(name)
            .ok_or_else(|| CommandError::not_found(name))?;
        let mut out = format!("NAME\n\t{} - {}\n", command.name(), command.description());
        let mut synopsis = command.name().to_string();
        for option in command.options() {
            let _ = write!(synopsis, " [{option}]");
        }
        let _ = write!(out, "\nSYNOPSIS\n\t{synopsis}\n");
        if !command.options().is_empty() {
            out.push_str("\nOPTIONS\n");
            for option in command.options() {
                let _ = write!(out, "\t{option}\n\t\t{}\n", option.help);
            }
        }
        if !command.aliases().is_empty() {
            let _ = write!(out, "\nALSO KNOWN AS\n\t{}\n", command.aliases().join(", "));
        }
        if let Availability::Unavailable { reason } = command.availability(services, auth) {
            let _ = write!(
                out,
                "\nCURRENTLY UNAVAILABLE\n\tThis command is currently not available because {reason}.\n"
            );
        }
        Ok(out.trim_end().to_string())
    }
}

impl Command for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "Display help about available commands."
    }

    fn execute<'a>(&'a self, call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(async move {
            let auth = call.ctx.authentication();
            let text = match call.args.positional().first() {
                Some(name) => Self::describe(name, call.services, auth)?,
                None => Self::list(call.services, auth),
            };
            Ok(CommandOutput::Text(text))
        })
    }
}

/// Ends the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exit;

impl Command for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    fn aliases(&self) -> &[&str] {
        &["quit"]
    }

    fn description(&self) -> &str {
        "Exit the shell."
    }

    fn execute<'a>(&'a self, call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(async move {
            call.ctx.request_exit();
            Ok(CommandOutput::Empty)
        })
    }
}

/// Clears the screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clear;

impl Command for Clear {
    fn name(&self) -> &str {
        "clear"
    }

    fn description(&self) -> &str {
        "Clear the shell screen."
    }

    fn execute<'a>(&'a self, call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(async move {
            let terminal = call.ctx.terminal_mut();
            terminal.puts(Capability::CursorHome)?;
            terminal.puts(Capability::ClearScreen)?;
            terminal.flush()?;
            Ok(CommandOutput::Empty)
        })
    }
}

const WATCH_OPTIONS: &[OptionSpec] = &[
    OptionSpec::value('d', "delay", "Refresh delay in milliseconds (at least 1000)"),
    OptionSpec::flag("inline", "Render below the prompt instead of full screen"),
];

/// Re-runs an actuator command in an auto-refreshing view.
#[derive(Debug, Clone, Copy, Default)]
pub struct Watch;

fn watch_frame(
    title: &str,
    delay: Duration,
    kind: ActuatorKind,
    args: &Args,
    services: &ShellServices,
) -> Vec<StyledLine> {
    let header = format!("Every {}ms: {title}", delay.as_millis());
    let mut lines = vec![
        StyledLine::styled(header, Style::new().bold()),
        StyledLine::styled("q: quit, +/-: change delay", Style::new().fg(Color::Cyan)),
        StyledLine::new(),
    ];
    match kind.query(args, services).and_then(|out| out.render()) {
        Ok(Some(text)) => lines.extend(StyledLine::from_text(&text)),
        Ok(None) => {}
        Err(e) => lines.push(StyledLine::styled(e.to_string(), Style::new().fg(Color::Red))),
    }
    lines
}

impl Command for Watch {
    fn name(&self) -> &str {
        "watch"
    }

    fn description(&self) -> &str {
        "Refresh an actuator command periodically."
    }

    fn options(&self) -> &[OptionSpec] {
        WATCH_OPTIONS
    }

    fn parse_args(&self, words: &[String]) -> CommandResult<Args> {
        Args::parse_leading(words, WATCH_OPTIONS)
    }

    fn execute<'a>(&'a self, call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(async move {
            let Call { ctx, args, services } = call;
            let (name, rest) = args
                .positional()
                .split_first()
                .ok_or_else(|| CommandError::invalid_argument("Missing command to watch"))?;
            if services.commands().get(name).is_none() {
                return Err(CommandError::not_found(name.as_str()));
            }
            let kind: ActuatorKind = name.parse().map_err(|_| {
                CommandError::invalid_argument(format!("Command '{name}' cannot be watched"))
            })?;
            if !kind.is_read_only() {
                return Err(CommandError::invalid_argument(format!(
                    "Command '{name}' cannot be watched"
                )));
            }
            if let Availability::Unavailable { reason } =
                actuator_availability(kind.name(), services.config(), services.endpoints(), ctx.authentication())
            {
                return Err(CommandError::unavailable(kind.name(), reason));
            }
            let inner = Args::parse(rest, kind.options())?;
            let delay = args
                .parse_value::<u64>("delay")?
                .map_or(MIN_DELAY, Duration::from_millis);
            let options = InteractiveOptions::new()
                .with_delay(delay)
                .with_full_screen(!args.flag("inline"));
            let title = args.positional().join(" ");

            let mut producer = |_size: TerminalSize, delay: Duration| -> Result<Vec<StyledLine>> {
                Ok(watch_frame(&title, delay, kind, &inner, services))
            };
            let result = ShellHelper::new(ctx).interactive(&mut producer, options).await?;
            tracing::debug!(
                command = kind.name(),
                frames = result.frames,
                reason = ?result.reason,
                "watch ended"
            );
            Ok(CommandOutput::Empty)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::endpoints::{from_fn, ids};
    use serde_json::json;

    #[test]
    fn list_marks_unavailable_commands() {
        let services = ShellServices::builder(ShellConfig::default()).build();
        let text = Help::list(&services, None);
        assert!(text.starts_with("AVAILABLE COMMANDS\n\nBuilt-In Commands\n"));
        assert!(text.contains("        help: Display help about available commands."));
        assert!(text.contains("        exit, quit: Exit the shell."));
        assert!(text.contains("      * shutdown: Shutdown application."));
        assert!(text.contains("      * beans: Display beans endpoint."));
        assert!(text.contains("        health: Display health endpoint."));
        assert!(text.contains("Commands marked with (*) are currently unavailable."));
    }

    #[test]
    fn describe_one_command() {
        let services = ShellServices::builder(ShellConfig::default()).build();
        let text = Help::describe("metrics", &services, None).unwrap();
        assert!(text.starts_with("NAME\n\tmetrics - Display metrics endpoint."));
        assert!(text.contains("SYNOPSIS\n\tmetrics [-n, --name <value>] [-t, --tags <value>]"));
        assert!(text.contains("\t\tMetric name to get"));
        assert!(!text.contains("UNAVAILABLE"));

        let text = Help::describe("beans", &services, None).unwrap();
        assert!(text.ends_with("because beans endpoint is not registered."));
        assert!(Help::describe("nope", &services, None).is_err());
    }

    #[test]
    fn frame_has_header_and_content() {
        let services = ShellServices::builder(ShellConfig::default())
            .with_endpoint(from_fn(ids::BEANS, |_| Ok(json!({"beans": ["a"]}))))
            .build();
        let lines = watch_frame("beans", Duration::from_secs(2), ActuatorKind::Beans, &Args::default(), &services);
        assert_eq!(lines[0].plain_text(), "Every 2000ms: beans");
        assert_eq!(lines[3].plain_text(), "{");
        assert!(lines.iter().any(|l| l.plain_text().contains("\"a\"")));
    }

    #[test]
    fn frame_shows_errors() {
        let services = ShellServices::builder(ShellConfig::default()).build();
        let lines = watch_frame("mappings", MIN_DELAY, ActuatorKind::Mappings, &Args::default(), &services);
        assert_eq!(
            lines.last().map(StyledLine::plain_text).as_deref(),
            Some("Command 'mappings' exists but is not currently available because mappings endpoint is not registered")
        );
    }
}
