//! radiomix: mixer control panel for ALSA-based audio-streaming appliances.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

mod cli;

/// Shared shutdown flag, cleared by the Ctrl+C handler.
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(
    name = "radiomix",
    version,
    about = "Mixer control, snapshots, and mute handling for audio-streaming appliances"
)]
struct Args {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log progress (info level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured sound card
    #[arg(long, global = true, value_name = "ID")]
    card: Option<String>,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    ctrlc::set_handler(move || {
        RUNNING.store(false, Ordering::SeqCst);
    })
    .ok();

    let globals = cli::Globals {
        json: args.json,
        config_path: args.config,
        card: args.card,
    };

    if let Err(e) = cli::run(args.command, &globals) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
