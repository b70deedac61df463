//! Threads of the running process.
//!
//! Read from `/proc/self/task`; elsewhere the list is empty.

use std::path::Path;

use serde_json::{Value, json};

use super::{Endpoint, EndpointRequest, ids};
use crate::error::CommandResult;

const TASKS: &str = "/proc/self/task";

/// One thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    /// Kernel thread id.
    pub id: u64,
    /// Thread name.
    pub name: String,
    /// Scheduler state.
    pub state: &'static str,
}

fn state_name(code: char) -> &'static str {
    match code {
        'R' => "RUNNABLE",
        'S' | 'I' => "WAITING",
        'D' => "BLOCKED",
        'T' | 't' => "STOPPED",
        'Z' | 'X' => "TERMINATED",
        _ => "UNKNOWN",
    }
}

/// The state code from a `stat` line: the first field after the
/// parenthesized command name.
fn parse_stat_state(stat: &str) -> Option<char> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

fn read_thread(dir: &Path) -> Option<ThreadInfo> {
    let id = dir.file_name()?.to_str()?.parse().ok()?;
    let name = std::fs::read_to_string(dir.join("comm"))
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default();
    let state = std::fs::read_to_string(dir.join("stat"))
        .ok()
        .and_then(|s| parse_stat_state(&s))
        .map_or("UNKNOWN", state_name);
    Some(ThreadInfo { id, name, state })
}

/// Threads of this process, by id.
#[must_use]
pub fn threads() -> Vec<ThreadInfo> {
    let Ok(entries) = std::fs::read_dir(TASKS) else {
        tracing::debug!(path = TASKS, "thread listing unavailable");
        return Vec::new();
    };
    let mut threads: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| read_thread(&e.path()))
        .collect();
    threads.sort_by_key(|t| t.id);
    threads
}

/// Lists process threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDumpEndpoint;

impl Endpoint for ThreadDumpEndpoint {
    fn id(&self) -> &str {
        ids::THREADDUMP
    }

    fn invoke(&self, _request: &EndpointRequest) -> CommandResult<Value> {
        let threads: Vec<Value> = threads()
            .into_iter()
            .map(|t| json!({ "threadId": t.id, "threadName": t.name, "threadState": t.state }))
            .collect();
        Ok(json!({ "threads": threads }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_state_after_command_name() {
        assert_eq!(parse_stat_state("42 (tokio (worker)) S 1 2 3"), Some('S'));
        assert_eq!(parse_stat_state("garbage"), None);
        assert_eq!(state_name('R'), "RUNNABLE");
        assert_eq!(state_name('?'), "UNKNOWN");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn lists_current_thread() {
        let value = ThreadDumpEndpoint.invoke(&EndpointRequest::new()).unwrap();
        assert!(!value["threads"].as_array().unwrap().is_empty());
    }
}
