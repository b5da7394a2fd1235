//! `pbxedit` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, configure logging and dispatch one subcommand.
//! - Map failures to a non-zero exit code with a one-line message on stderr.

mod commands;
mod error;
mod locate;
mod walk;

use clap::{Parser, Subcommand};
use error::{CliError, CliResult};
use log::{error, info};
use pbxedit_core::{default_log_level, init_logging, Project, WriteOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Edit Xcode project manifests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files (stderr when omitted)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the manifest found from the current directory as JSON
    Search,
    /// Add a folder and everything below it as a new group
    Add {
        /// Folder to add, relative to the current directory
        folder: PathBuf,

        /// Save the edited manifest in place
        #[arg(long, conflicts_with = "output")]
        write: bool,

        /// Save the edited manifest to this file instead
        #[arg(long)]
        output: Option<PathBuf>,

        /// Group that receives the new folder group
        #[arg(long, default_value = "Runner")]
        append_to: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("pbxedit: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let cwd = std::env::current_dir().map_err(|source| CliError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    setup_logging(&cwd, cli.log_level.as_deref(), cli.log_dir.as_deref())?;

    match cli.command {
        Command::Search => {
            let report = commands::search(&cwd);
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Add {
            folder,
            write,
            output,
            append_to,
        } => {
            let manifest = locate::locate_manifest(&cwd)
                .ok_or_else(|| CliError::ManifestNotFound(cwd.clone()))?;
            let mut project = Project::open(&manifest)?;
            let summary = commands::add_folder(&mut project, &cwd.join(folder), &append_to)?;

            let options = WriteOptions::default();
            if write {
                project.save(&options)?;
            } else if let Some(output) = output {
                project.save_to(cwd.join(output), &options)?;
            } else {
                print!("{}", project.write_string(&options));
            }
            info!(
                "event=cli_add module=cli status=ok manifest={} groups={}",
                manifest.display(),
                summary.groups
            );
        }
    }
    Ok(())
}

fn setup_logging(cwd: &Path, level: Option<&str>, log_dir: Option<&Path>) -> CliResult<()> {
    let level = level.unwrap_or_else(|| default_log_level());
    let log_dir = log_dir.map(|dir| cwd.join(dir));
    let log_dir = match &log_dir {
        Some(dir) => Some(dir.to_str().ok_or_else(|| {
            CliError::Logging(format!("log dir is not valid UTF-8: {}", dir.display()))
        })?),
        None => None,
    };
    init_logging(level, log_dir).map_err(CliError::Logging)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn add_defaults_to_runner_group_and_stdout() {
        let cli = Cli::try_parse_from(["pbxedit", "add", "Plugin"]).unwrap();

        match cli.command {
            Command::Add {
                write,
                output,
                append_to,
                ..
            } => {
                assert!(!write);
                assert!(output.is_none());
                assert_eq!(append_to, "Runner");
            }
            Command::Search => panic!("expected add"),
        }
    }

    #[test]
    fn write_conflicts_with_output() {
        let result = Cli::try_parse_from(["pbxedit", "add", "Plugin", "--write", "--output", "out"]);

        assert!(result.is_err());
    }

    #[test]
    fn log_flags_are_global() {
        let cli = Cli::try_parse_from(["pbxedit", "search", "--log-level", "debug"]).unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
