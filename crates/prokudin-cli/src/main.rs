mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "prokudin",
    about = "Align and combine three monochrome exposures into a color image"
)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show dimensions and color info of the three inputs
    Info(commands::info::InfoArgs),
    /// Align, adjust, crop and export channels plus the combined image
    Run(commands::run::RunArgs),
    /// Render the combined or a single-channel preview to one file
    Preview(commands::preview::PreviewArgs),
    /// Print or save the default configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Preview(args) => commands::preview::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
