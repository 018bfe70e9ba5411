// CLI module - command-line argument parsing and handlers
//
// Provides subcommands for configuration management:
// - config --show: Display effective configuration
// - config --path: Show config file path
// - config --reset: Regenerate config file with defaults
//
// Global flags (--api-url, --demo, --no-tui) are runtime overrides applied on
// top of env and file configuration.

use crate::config::{Config, VERSION};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;

/// streamwatch - Operator console for live stream monitoring
#[derive(Parser, Debug)]
#[command(name = "streamwatch")]
#[command(version = VERSION)]
#[command(about = "Operator console for live stream monitoring", long_about = None)]
pub struct Cli {
    /// Monitoring API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Serve an in-memory demo API and connect to it
    #[arg(long, global = true)]
    pub demo: bool,

    /// Run headless (log to stdout instead of the TUI)
    #[arg(long, global = true)]
    pub no_tui: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config(ConfigAction),
}

/// Exactly one of the flags; clap prints usage otherwise
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ConfigAction {
    /// Show effective configuration
    #[arg(long)]
    pub show: bool,

    /// Reset config file to defaults
    #[arg(long)]
    pub reset: bool,

    /// Show config file path
    #[arg(long)]
    pub path: bool,
}

impl Cli {
    /// Apply runtime flags over env/file configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        config.demo_mode |= self.demo;
        if self.no_tui {
            config.enable_tui = false;
        }
    }
}

/// Parse the command line. `Ok(None)` means a subcommand ran and the
/// process should exit.
pub fn handle_cli() -> Result<Option<Cli>> {
    let cli = Cli::parse();

    let Some(Commands::Config(action)) = &cli.command else {
        return Ok(Some(cli));
    };
    if action.path {
        println!("{}", config_path()?.display());
    } else if action.show {
        show_config(&cli);
    } else if action.reset {
        reset_config()?;
    }
    Ok(None)
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().context("Could not determine config path")
}

fn show_config(cli: &Cli) {
    let mut config = Config::from_env();
    cli.apply(&mut config);

    println!("# Effective configuration (flags > env > file > defaults)");
    println!();
    print!("{}", config.to_toml());
    println!();
    println!("# Runtime");
    println!("# enable_tui = {}", config.enable_tui);
    println!("# demo_mode = {}", config.demo_mode);
    let credentials = if config.credentials.is_some() { "set" } else { "not set" };
    println!("# headless credentials = {}", credentials);

    println!();
    match Config::config_path() {
        Some(path) if path.exists() => println!("# Source: {}", path.display()),
        _ => println!("# Source: defaults (no config file)"),
    }
}

/// Ask before replacing an existing file. A failed read counts as "no".
fn confirm_overwrite(path: &std::path::Path) -> bool {
    eprint!("Config file exists at {}. Overwrite? [y/N] ", path.display());
    let _ = std::io::stderr().flush();

    let mut input = String::new();
    std::io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
}

fn reset_config() -> Result<()> {
    let path = config_path()?;
    if path.exists() && !confirm_overwrite(&path) {
        println!("Aborted.");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("Could not write {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_flags_override_config() {
        let cli = Cli::try_parse_from([
            "streamwatch",
            "--api-url",
            "http://monitor.example:8000",
            "--demo",
            "--no-tui",
        ])
        .unwrap();
        assert!(cli.command.is_none());

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.api_url, "http://monitor.example:8000");
        assert!(config.demo_mode);
        assert!(!config.enable_tui);
    }

    #[test]
    fn test_no_flags_leave_config_alone() {
        let cli = Cli::try_parse_from(["streamwatch"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.api_url, crate::config::DEFAULT_API_URL);
        assert!(!config.demo_mode);
        assert!(config.enable_tui);
    }

    #[test]
    fn test_config_subcommand_parses() {
        let cli = Cli::try_parse_from(["streamwatch", "config", "--path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config(ConfigAction { path: true, .. }))
        ));
    }

    #[test]
    fn test_config_subcommand_needs_exactly_one_action() {
        assert!(Cli::try_parse_from(["streamwatch", "config"]).is_err());
        assert!(Cli::try_parse_from(["streamwatch", "config", "--show", "--reset"]).is_err());
    }
}
