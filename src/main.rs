//! tvlink - Android TV power and input control over ADB
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tvlink_app::config::{default_config_path, init_config};

/// tvlink - Android TV power and input control over ADB
#[derive(Parser, Debug)]
#[command(name = "tvlink")]
#[command(about = "Bridge Android TVs to a smart-home accessory layer over ADB", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, short, env = "TVLINK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Mirror logs to stderr
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run device sessions; NDJSON events on stdout, intents on stdin
    Run,
    /// Reconcile every device once and print its state
    Status,
    /// Write a starter configuration file
    Init,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    tvlink_core::logging::init(args.verbose)?;

    let config_path = args.config.unwrap_or_else(default_config_path);

    match args.command.unwrap_or(Command::Run) {
        Command::Run => tvlink::run_headless(&config_path).await?,
        Command::Status => tvlink::print_status(&config_path).await?,
        Command::Init => {
            if init_config(&config_path)? {
                eprintln!("Created {}", config_path.display());
            } else {
                eprintln!("{} already exists", config_path.display());
            }
        }
    }

    Ok(())
}
