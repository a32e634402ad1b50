//! Command-line parsing and command routing.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// A terminal voice recorder that uploads what you record
#[derive(Parser)]
#[command(name = "voxdrop")]
#[command(version)]
#[command(about = "A terminal voice recorder that uploads what you record")]
#[command(long_about = "A terminal voice recorder that uploads what you record.\n\nPress Space (or Enter) to start recording, watch the live waveform, and press\nit again to stop. The recording is encoded to MP3 and uploaded to your server,\nwhich answers with a link to listen to it.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n\nEXAMPLES:\n    # Record against the configured server\n    $ voxdrop\n\n    # Record against another server for this run\n    $ voxdrop --server https://rec.example.com\n\n    # Toggle recording from a window manager keybinding\n    $ pkill -USR1 voxdrop\n\n    # Upload an existing file and print the link\n    $ voxdrop upload memo.mp3")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/voxdrop/voxdrop.toml\n    Logs:               ~/.local/state/voxdrop/voxdrop.log.*"
)]
struct Cli {
    /// Upload server base URL, overriding upload.server_url for this run
    #[arg(short, long, value_name = "URL", global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record with live waveform and upload on stop (default)
    ///
    /// Space/Enter toggles recording, Escape/q quits.
    /// SIGUSR1 toggles recording from outside the terminal.
    #[command(visible_alias = "r")]
    Record,

    /// Upload an existing MP3 file and print its link
    #[command(visible_alias = "u")]
    Upload {
        /// Path to the MP3 file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the status as an HTML fragment with a link instead of the bare URL
        #[arg(long)]
        html: bool,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names and native formats to help set
    /// the input device in voxdrop.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   voxdrop completions bash > voxdrop.bash
    ///   voxdrop completions zsh > _voxdrop
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that print to the terminal and need no logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "voxdrop", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => return commands::handle_list_devices(),
        Some(Commands::Logs) => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Record) => commands::handle_record(cli.server).await?,
        Some(Commands::Upload { file, html }) => {
            commands::handle_upload(file, html, cli.server).await?
        }
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_record() {
        let cli = Cli::try_parse_from(["voxdrop", "--server", "http://h:1"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.server.as_deref(), Some("http://h:1"));
    }

    #[test]
    fn test_upload_takes_file_and_global_server() {
        let cli = Cli::try_parse_from(["voxdrop", "upload", "memo.mp3", "-s", "http://h:1"]).unwrap();
        match cli.command {
            Some(Commands::Upload { file, html }) => {
                assert_eq!(file, PathBuf::from("memo.mp3"));
                assert!(!html);
            }
            _ => panic!("expected upload command"),
        }
        assert_eq!(cli.server.as_deref(), Some("http://h:1"));
    }
}
