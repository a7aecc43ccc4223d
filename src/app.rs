//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use crate::store::{Material, Shape, Size};
use anyhow::anyhow;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Checks if setup is needed (version mismatch or missing config) and runs setup if required.
///
/// This is called early in the startup sequence, before command handling.
/// It checks:
/// 1. If config file doesn't exist, runs full setup
/// 2. If config version is older than app version, runs setup and logs migration
/// 3. If config version matches app version, does nothing
async fn check_and_run_setup() -> Result<(), anyhow::Error> {
    let config_path = crate::config::get_config_path()?;

    match crate::setup::version::check_setup_needed(&config_path)? {
        Some(old_version) => {
            // Setup is needed - either config doesn't exist or version is older
            tracing::info!(
                "Setup needed - migrating from version {} to {}",
                old_version,
                env!("CARGO_PKG_VERSION")
            );
            crate::setup::run_setup().map_err(|e| {
                tracing::error!("Setup failed: {e}");
                anyhow!("Setup failed: {e}")
            })?;
            crate::setup::version::update_config_version(&config_path).map_err(|e| {
                tracing::error!("Failed to update config version: {e}");
                anyhow!("Failed to update config version: {e}")
            })?;
            tracing::info!(
                "Setup completed successfully - migrated to version {}",
                env!("CARGO_PKG_VERSION")
            );
        }
        None => {
            // Config exists and version matches, no setup needed
            tracing::debug!("Config version up to date ({})", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// A command-line recorder that catalogs household objects by their echo signature
#[derive(Parser)]
#[command(name = "echotag")]
#[command(version)]
#[command(about = "Record and catalog echo signatures of household objects")]
#[command(
    long_about = "Record and catalog echo signatures of household objects.\n\nEach session captures a stretch of room tone, plays a sine sweep through the\nspeaker at full scale, and keeps recording while the echo decays. Takes are\ntagged with material, size and shape, kept locally, and optionally mirrored\nto a remote backend.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Record options (-d, --material, --size, --shape, --defaults, --no-upload)\n    can be used without explicitly saying 'record'.\n\nEXAMPLES:\n    # Record with interactive tag prompts\n    $ echotag\n\n    # Record a tagged glass jar without prompts\n    $ echotag -d \"jam jar\" --material glass --size small --shape cylindrical\n\n    # Record using default tags, keep it local\n    $ echotag --defaults --no-upload\n\n    # Review and replay\n    $ echotag list\n    $ echotag play 2\n\n    # Pull a take out of the data directory\n    $ echotag export 1 --out ~/measurements/\n\n    # Edit configuration file\n    $ echotag config"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/echotag/echotag.toml\n    Entries:            ~/.local/share/echotag/entries.json\n    Recordings:         ~/.local/share/echotag/recordings/\n    Logs:               ~/.local/state/echotag/echotag.log.*\n\nUPLOADS:\n    Set [upload] endpoint and api_key in the config file, or export\n    ECHOTAG_UPLOAD_ENDPOINT / ECHOTAG_UPLOAD_API_KEY."
)]
struct Cli {
    /// Short description of the tagged object (record default command)
    #[arg(short, long, global = true)]
    description: Option<String>,

    /// Material tag (record default command)
    #[arg(long, global = true, value_enum)]
    material: Option<Material>,

    /// Size tag (record default command)
    #[arg(long, global = true, value_enum)]
    size: Option<Size>,

    /// Shape tag (record default command)
    #[arg(long, global = true, value_enum)]
    shape: Option<Shape>,

    /// Skip tag prompts, using defaults for anything not given (record default command)
    #[arg(long, global = true)]
    defaults: bool,

    /// Keep this recording local even when an upload backend is configured (record default command)
    #[arg(long = "no-upload", global = true)]
    no_upload: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an echo session (default)
    ///
    /// Captures a stretch of room tone, plays the probe sweep at full scale,
    /// and keeps recording until the reflections settle. Send SIGUSR1 to
    /// stop early; Ctrl-C cancels without saving anything.
    #[command(visible_alias = "r")]
    Record {
        /// Short description of the tagged object
        #[arg(short, long)]
        description: Option<String>,

        /// Material tag
        #[arg(long, value_enum)]
        material: Option<Material>,

        /// Size tag
        #[arg(long, value_enum)]
        size: Option<Size>,

        /// Shape tag
        #[arg(long, value_enum)]
        shape: Option<Shape>,

        /// Skip tag prompts, using defaults for anything not given
        #[arg(long)]
        defaults: bool,

        /// Keep this recording local even when an upload backend is configured
        #[arg(long = "no-upload")]
        no_upload: bool,
    },

    /// List recorded entries, newest first
    ///
    /// The printed position numbers are what play, export and delete take.
    #[command(visible_alias = "l", alias = "ls")]
    List,

    /// Replay a recording using the system audio player
    ///
    /// Plays back the audio of a previous session without re-recording.
    /// Uses open (macOS) or xdg-open/mpv/vlc/ffplay/paplay (Linux).
    #[command(visible_alias = "p")]
    Play {
        /// Recording position (1 = most recent, 2 = second most recent, etc.)
        #[arg(value_name = "N")]
        index: Option<usize>,
    },

    /// Export a recording to a file or directory
    ///
    /// Copies the audio file out of the app's data directory under its
    /// canonical name, or to an explicit target path.
    Export {
        /// Recording position (1 = most recent)
        #[arg(value_name = "N")]
        index: Option<usize>,

        /// Destination path or directory (defaults to the current directory)
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Delete a recording and its history entry
    ///
    /// Removes the entry from the list and best-effort deletes the audio
    /// file. The entry disappears even when the file removal fails.
    Delete {
        /// Recording position (1 = most recent)
        #[arg(value_name = "N")]
        index: usize,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio, session timing and upload settings.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in echotag.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the tail of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs {
        /// Number of lines to show (defaults to 50)
        #[arg(short = 'n', long, value_name = "N")]
        lines: Option<usize>,
    },

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   echotag completions bash > echotag.bash
    ///   echotag completions zsh > _echotag
    ///   echotag completions fish > echotag.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If setup fails
/// - If logging initialization fails
/// - If command execution fails (e.g., recording, history operations)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "echotag", &mut io::stdout());
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
        Some(Commands::Logs { lines }) => {
            return match commands::handle_logs(*lines) {
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

    // Check if setup is needed (version check or missing config)
    check_and_run_setup().await?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Record { .. }) => {
            // Default command is record
            // Merge top-level options with explicit record command options
            // If both are specified, the explicit record command options take precedence
            let (description, material, size, shape, defaults, no_upload) = match cli.command {
                Some(Commands::Record {
                    description,
                    material,
                    size,
                    shape,
                    defaults,
                    no_upload,
                }) => (description, material, size, shape, defaults, no_upload),
                None => (
                    cli.description,
                    cli.material,
                    cli.size,
                    cli.shape,
                    cli.defaults,
                    cli.no_upload,
                ),
                _ => unreachable!(),
            };
            if let Err(e) =
                commands::handle_record(description, material, size, shape, defaults, no_upload)
                    .await
            {
                // Check if it's a cancellation error (cliclack already displayed the message)
                let err_msg = e.to_string();
                if err_msg.contains("cancelled") || err_msg.contains("interrupted") {
                    // Silent exit - cliclack already showed "Operation cancelled"
                    process::exit(0);
                } else {
                    return Err(e);
                }
            }
        }
        Some(Commands::List) => {
            commands::handle_list().await?;
        }
        Some(Commands::Play { index }) => {
            commands::handle_play(index).await?;
        }
        Some(Commands::Export { index, out }) => {
            commands::handle_export(index, out).await?;
        }
        Some(Commands::Delete { index }) => {
            commands::handle_delete(index).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs { .. }) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
