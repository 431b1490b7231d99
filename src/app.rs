//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal spectrum waterfall driven by live microphone audio
#[derive(Parser)]
#[command(name = "cascade")]
#[command(version)]
#[command(about = "Live microphone spectrum waterfall for the terminal")]
#[command(
    long_about = "Renders a scrolling 3D waterfall of your microphone's frequency spectrum\nin the terminal.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used by default.\n    The device override (-d) can be used without explicitly saying 'run'.\n\nEXAMPLES:\n    # Start the waterfall on the default input device\n    $ cascade\n\n    # Start on input device 2 (see `cascade list-devices`)\n    $ cascade -d 2\n\n    # Edit configuration file\n    $ cascade config\n\nKEYS:\n    l  toggle the line layer\n    r  toggle the ribbon layer\n    c  switch between hue and uniform coloring\n    q  quit (also Escape or Ctrl+C)"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/cascade/cascade.toml\n    Logs:               ~/.local/state/cascade/cascade.log.*"
)]
struct Cli {
    /// Audio input device: name or index from `cascade list-devices` (run default command)
    #[arg(short, long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the waterfall visualization (default)
    ///
    /// Press 'l'/'r' to toggle layers, 'c' to switch coloring, 'q' to quit.
    #[command(visible_alias = "r")]
    Run {
        /// Audio input device: name or index from `cascade list-devices`
        #[arg(short, long)]
        device: Option<String>,
    },

    /// List available audio input devices
    ///
    /// Shows device indices, names, and configurations to help configure
    /// the correct input device in cascade.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio, history, and style settings.
    /// Uses $EDITOR environment variable or falls back to nano/vim.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   cascade completions bash > cascade.bash
    ///   cascade completions zsh > _cascade
    ///   cascade completions fish > cascade.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails (e.g., audio capture, rendering)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "cascade", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Run { .. }) => {
            // Default command is run
            // An explicit `run --device` takes precedence over the top-level flag
            let device = match cli.command {
                Some(Commands::Run { device }) => device.or(cli.device),
                None => cli.device,
                _ => unreachable!(),
            };
            commands::handle_run(device).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
