pub mod searchable;
pub mod ssh;
pub mod ssh_config;
pub mod tmux;
pub mod ui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ssh_config::Host;
use std::path::{Path, PathBuf};
use ui::{App, AppConfig, Selection, Theme};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SSH configuration file
    #[arg(short, long, default_value = "~/.ssh/config")]
    config: String,

    /// Host search filter
    #[arg(short, long)]
    search: Option<String>,
}

// No logger is installed: the menu owns the terminal, so the `log::debug!`
// traces stay silent unless a logger is wired in here.
fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config_path = PathBuf::from(shellexpand::tilde(&args.config).into_owned());

    let hosts = read_hosts(&config_path)?;

    let mut app = App::new(
        hosts,
        AppConfig {
            config_path,
            search_filter: args.search,
        },
        Theme::default(),
    );

    launch(app.start().context("Error rendering menu")?)
}

fn read_hosts(config_path: &Path) -> Result<Vec<Host>> {
    let hosts = ssh_config::Parser::for_config(config_path)
        .parse_file(config_path)
        .context("Error reading SSH config")?;

    if hosts.is_empty() {
        bail!("No SSH hosts found in {}", config_path.display());
    }

    Ok(hosts)
}

fn launch(selection: Selection) -> Result<()> {
    let Selection::Host(selection) = selection else {
        return Ok(());
    };

    let host = ssh::normalize_alias(&selection);
    println!("Connecting to {host} ...");

    // Only returns if neither tmux nor ssh could take over the process.
    Err(ssh::connect(host).into())
}
