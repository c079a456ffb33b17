mod commands;
mod explorer;
mod script;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use settings::AppSettings;

#[derive(Parser)]
#[command(name = "mandelzoom", about = "Progressive Mandelbrot and Julia set explorer")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one view to a PNG
    Render(commands::render::RenderArgs),
    /// Replay a gesture script against the Mandelbrot and Julia views
    Replay(commands::replay::ReplayArgs),
    /// List the available palettes
    Palettes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Mandelzoom");

    let settings_path = cli.settings.unwrap_or_else(settings::default_path);
    let mut app_settings = AppSettings::load_from(&settings_path);

    match &cli.command {
        Commands::Render(args) => commands::render::run(args, &mut app_settings)?,
        Commands::Replay(args) => commands::replay::run(args, &mut app_settings)?,
        Commands::Palettes => commands::palettes::run()?,
    }

    app_settings.save_to(&settings_path);
    Ok(())
}
