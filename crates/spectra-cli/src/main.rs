mod commands;
mod repl;
mod styles;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "spectra",
    about = "Long-slit spectrum extraction and wavelength calibration"
)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Session config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show FITS image or spectrum file details
    Info(commands::info::InfoArgs),
    /// Extract a spectrum from a band of image rows
    Extract(commands::extract::ExtractArgs),
    /// Fit a wavelength solution and calibrate a spectrum
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Find the local maximum a pixel climbs to
    Peak(commands::peak::PeakArgs),
    /// Print or save the default session config
    Config(commands::config::ConfigArgs),
    /// Start an interactive measurement session
    Session(commands::session::SessionArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Extract(args) => commands::extract::run(args, &config),
        Commands::Calibrate(args) => commands::calibrate::run(args, &config),
        Commands::Peak(args) => commands::peak::run(args),
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::Session(args) => commands::session::run(args, config),
    }
}
