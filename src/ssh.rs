use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::tmux;

const SSH: &str = "ssh";

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("ssh command not found")]
    NotFound(#[from] which::Error),

    #[error("Failed to execute ssh")]
    Exec(#[from] io::Error),
}

/// Strips anything after the first space of a menu selection, e.g. the
/// extra patterns of `Host web web.example.com`.
#[must_use]
pub fn normalize_alias(selection: &str) -> &str {
    selection
        .split_once(' ')
        .map_or(selection, |(alias, _)| alias)
}

/// # Errors
///
/// Will return `Err` if `ssh` is not on `PATH`.
pub fn find_ssh() -> Result<PathBuf, LaunchError> {
    Ok(which::which(SSH)?)
}

#[must_use]
pub fn command(ssh: &Path, host: &str) -> Command {
    let mut command = Command::new(ssh);
    command.arg0(SSH).arg(host);
    command
}

/// Hands the terminal over to `ssh <host>`, inside a dedicated tmux window
/// when possible.
///
/// On success this process is replaced and the function never returns. The
/// returned value is always the reason it failed.
pub fn connect(host: &str) -> LaunchError {
    let ssh = match find_ssh() {
        Ok(ssh) => ssh,
        Err(e) => return e,
    };

    let skipped = tmux::ensure_window(host);
    log::debug!("connecting without a tmux window: {skipped:?}");

    command(&ssh, host).exec().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_alias() {
        assert_eq!(normalize_alias("server1"), "server1");
        assert_eq!(normalize_alias("web web.example.com"), "web");
        assert_eq!(normalize_alias("trailing "), "trailing");
    }

    #[test]
    fn test_command_passes_host_as_sole_argument() {
        let command = command(Path::new("/usr/bin/ssh"), "server1");

        assert_eq!(command.get_program(), "/usr/bin/ssh");
        assert_eq!(
            command.get_args().collect::<Vec<_>>(),
            vec![std::ffi::OsStr::new("server1")]
        );
    }
}
