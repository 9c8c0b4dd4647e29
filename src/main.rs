//! STEMwerk - command-line entry point for the host actions.
//!
//! # Overview
//!
//! Each subcommand corresponds to one action the host exposes:
//! - `setup`: find Python, install audio-separator if needed, verify ffmpeg, save config
//! - `check`: read-only diagnostics
//! - `separate` / `quick`: run the separation helper on an audio file
//! - `models` / `devices`: list what the helper supports
//! - `config`, `toggle-debug`, `pick-script`: edit the extension state
//!
//! # Execution Flow
//!
//! 1. Open the configuration directory and the extension-state store
//! 2. Initialize logging → `<config dir>/logs/stemwerk.<date>`
//! 3. Detect the host environment (platform, home, script directory) once
//! 4. Run the action with native dialogs, or stdout output with `--headless`

use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use stemwerk::actions::{
    self, ActionContext, HelperListing, HostEnvironment, SetupOptions, WorkflowError,
};
use stemwerk::config::ExtStateStore;
use stemwerk::models::config::{KNOWN_KEYS, SECTION};
use stemwerk::services::{RealFileSystem, TokioProcessRunner};
use stemwerk::ui::{HeadlessPrompter, NativePrompter, Prompter};
use stemwerk::{APP_NAME, ConfigManager, Stem, StemwerkSettings, VERSION};

#[derive(Parser, Debug)]
#[command(name = "stemwerk", version, about = "AI stem separation launcher")]
struct Cli {
    /// Configuration directory (defaults to the per-user config dir)
    #[arg(long, global = true)]
    config_dir: Option<Utf8PathBuf>,

    /// Directory containing audio_separator_process.py (defaults to the executable's dir)
    #[arg(long, global = true)]
    script_dir: Option<Utf8PathBuf>,

    /// Verbose logging for this run
    #[arg(long, global = true)]
    debug: bool,

    /// Print to the terminal instead of showing dialogs
    #[arg(long, global = true)]
    headless: bool,

    /// Answer yes to every confirmation (headless mode)
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find and verify Python, install audio-separator, check ffmpeg, save configuration
    Setup {
        /// Never offer to install the separation package
        #[arg(long)]
        no_install: bool,
    },

    /// Report what would be used without changing anything
    Check {
        /// Probe every candidate and list the outcome of each
        #[arg(long)]
        all: bool,
    },

    /// Separate an audio file into stems
    Separate {
        input: Utf8PathBuf,

        /// vocals, drums, bass or all
        #[arg(long, short, default_value = "all")]
        stems: Stem,

        #[arg(long, short)]
        output_dir: Option<Utf8PathBuf>,
    },

    /// Separate using the stored quick preset
    Quick { input: Utf8PathBuf },

    /// List separation models known to the helper
    Models,

    /// List compute devices known to the helper
    Devices {
        /// Tab-separated `id name type` records (skipped devices prefixed with `skipped`)
        #[arg(long)]
        machine: bool,
    },

    /// Read or write the extension state
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Flip persistent debug logging
    ToggleDebug,

    /// Choose the separation helper script with a file picker
    PickScript,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Write every setting, filling unset keys with their defaults
    Init,
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
}

fn ensure_known_key(key: &str) -> Result<()> {
    if KNOWN_KEYS.contains(&key) {
        Ok(())
    } else {
        bail!("Unknown key '{}'. Known keys: {}", key, KNOWN_KEYS.join(", "))
    }
}

fn run_config(store: &mut dyn ExtStateStore, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            let entries = store.entries(SECTION);
            if entries.is_empty() {
                println!("[{}] (empty)", SECTION);
            } else {
                println!("[{}]", SECTION);
                for (key, value) in entries {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigCommand::Init => {
            StemwerkSettings::load(&*store).save(store)?;
            tracing::info!("Wrote all {} settings", SECTION);
        }
        ConfigCommand::Get { key } => {
            ensure_known_key(&key)?;
            println!("{}", store.get(SECTION, &key).unwrap_or_default());
        }
        ConfigCommand::Set { key, value } => {
            ensure_known_key(&key)?;
            store.set(SECTION, &key, &value)?;
            tracing::info!("Set {}.{}", SECTION, key);
        }
        ConfigCommand::Unset { key } => {
            ensure_known_key(&key)?;
            store.delete(SECTION, &key)?;
            tracing::info!("Unset {}.{}", SECTION, key);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir.clone() {
        Some(dir) => dir,
        None => ConfigManager::default_config_dir()?,
    };
    let config_manager = ConfigManager::new(&config_dir)?;
    let mut store = config_manager.open_ext_state()?;
    let settings = StemwerkSettings::load(&store);

    let debug_mode = cli.debug || settings.debug_mode;
    let _log_guard = stemwerk::logging::setup_logging(
        &config_manager.log_dir(),
        APP_NAME,
        debug_mode,
        debug_mode || cli.headless,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // Commands that only touch the store
    match cli.command {
        Commands::Config { action } => return run_config(&mut store, action),
        Commands::ToggleDebug => {
            let enabled = StemwerkSettings::toggle_debug(&mut store)?;
            println!("Debug mode {}", if enabled { "enabled" } else { "disabled" });
            return Ok(());
        }
        _ => {}
    }

    let runner = TokioProcessRunner::new().context("Failed to create process runtime")?;
    let fs = RealFileSystem;
    let prompter: Box<dyn Prompter> = if cli.headless {
        Box::new(HeadlessPrompter::new(cli.yes))
    } else {
        Box::new(NativePrompter)
    };

    let mut ctx = ActionContext {
        runner: &runner,
        fs: &fs,
        store: &mut store,
        prompter: prompter.as_ref(),
        environment: HostEnvironment::detect(cli.script_dir.clone())?,
        candidate_policy: config_manager.load_candidate_policy()?,
    };

    // Setup and separation report through the prompter, which already
    // prints to stdout in headless mode.
    let outcome: Result<(), WorkflowError> = match cli.command {
        Commands::Setup { no_install } => {
            let options = SetupOptions {
                offer_install: !no_install,
            };
            actions::run_setup(&mut ctx, options).map(|_| ())
        }
        Commands::Check { all } => {
            let report = actions::run_check(&ctx, all);
            print!("{}", report.render());
            if !report.is_healthy() {
                bail!("Installation is not ready; run `stemwerk setup`");
            }
            Ok(())
        }
        Commands::Separate {
            input,
            stems,
            output_dir,
        } => actions::run_separation(&ctx, &input, stems, output_dir).map(|_| ()),
        Commands::Quick { input } => actions::run_quick(&ctx, &input).map(|_| ()),
        Commands::Models => actions::list_helper(&ctx, HelperListing::Models)
            .map(|models| models.iter().for_each(|m| println!("{}", m))),
        Commands::Devices { machine: false } => actions::list_helper(&ctx, HelperListing::Devices)
            .map(|devices| devices.iter().for_each(|d| println!("{}", d))),
        Commands::Devices { machine: true } => {
            actions::list_device_inventory(&ctx).map(|inventory| {
                for device in &inventory.devices {
                    println!("{}\t{}\t{}", device.id, device.name, device.kind);
                }
                for skipped in &inventory.skipped {
                    println!("skipped\t{}\t{}\t{}", skipped.id, skipped.name, skipped.reason);
                }
            })
        }
        Commands::PickScript => {
            actions::choose_helper_script(&mut ctx).map(|path| println!("{}", path))
        }
        Commands::Config { .. } | Commands::ToggleDebug => Ok(()),
    };

    match outcome {
        Ok(()) => {
            tracing::info!("Done");
            Ok(())
        }
        Err(WorkflowError::Cancelled) => {
            tracing::info!("Cancelled by user");
            Ok(())
        }
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}
