//! One tmux window per SSH destination.
//!
//! Windows are named `ssh:<host>`. Connecting to a host that already has a
//! window focuses it instead of opening a second one.
//!
//! Every successful path ends by replacing the current process with a tmux
//! command, so [`ensure_window`] only ever returns the reason it did not.

use std::ffi::OsStr;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;
use thiserror::Error;

const TMUX: &str = "tmux";

/// Why [`ensure_window`] handed control back to the caller.
#[derive(Error, Debug)]
pub enum Skipped {
    #[error("not running inside tmux")]
    NotInTmux,

    #[error("cannot list tmux windows: {0}")]
    ListFailed(String),

    #[error("cannot exec tmux")]
    ExecFailed(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub index: u32,
    pub name: String,
}

/// What to do with tmux for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowPlan {
    /// Focus the existing window with this index.
    Select(u32),
    /// Open a new window running `ssh <host>`.
    Create { name: String, host: String },
}

impl WindowPlan {
    #[must_use]
    pub fn for_host(windows: &[Window], host: &str) -> WindowPlan {
        let name = window_name(host);

        match windows.iter().find(|window| window.name == name) {
            Some(window) => WindowPlan::Select(window.index),
            None => WindowPlan::Create {
                name,
                host: host.to_string(),
            },
        }
    }

    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new(TMUX);
        match self {
            WindowPlan::Select(index) => {
                command.args(["select-window", "-t", index.to_string().as_str()]);
            }
            WindowPlan::Create { name, host } => {
                command.args(["new-window", "-n", name.as_str(), "ssh", host.as_str()]);
            }
        }
        command
    }
}

#[must_use]
pub fn window_name(host: &str) -> String {
    format!("ssh:{host}")
}

/// tmux exports a non-empty `TMUX` variable to everything it spawns.
fn is_tmux_marker(value: Option<&OsStr>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Focus or create the `ssh:<host>` window by replacing this process with
/// tmux.
///
/// Returns only when that did not happen, e.g. outside tmux or when tmux is
/// missing, in which case the caller should connect in the current terminal.
pub fn ensure_window(host: &str) -> Skipped {
    ensure_window_with(std::env::var_os("TMUX").as_deref(), host)
}

fn ensure_window_with(marker: Option<&OsStr>, host: &str) -> Skipped {
    if !is_tmux_marker(marker) {
        return Skipped::NotInTmux;
    }

    let windows = match list_windows() {
        Ok(windows) => windows,
        Err(skipped) => return skipped,
    };

    let plan = WindowPlan::for_host(&windows, host);
    log::debug!("tmux window plan for {host}: {plan:?}");

    plan.command().exec().into()
}

fn list_windows() -> Result<Vec<Window>, Skipped> {
    let output = Command::new(TMUX)
        .args(["list-windows", "-F", "#{window_index},#{window_name}"])
        .output()
        .map_err(|e| Skipped::ListFailed(e.to_string()))?;

    if !output.status.success() {
        return Err(Skipped::ListFailed(format!(
            "list-windows exited with {}",
            output.status
        )));
    }

    Ok(parse_windows(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses `list-windows -F "#{window_index},#{window_name}"` output.
///
/// Window names may contain commas; lines without a numeric index are
/// dropped.
fn parse_windows(output: &str) -> Vec<Window> {
    output
        .lines()
        .filter_map(|line| {
            let (index, name) = line.split_once(',')?;
            Some(Window {
                index: index.trim().parse().ok()?,
                name: name.to_string(),
            })
        })
        .collect()
}
