use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use mandelzoom_render::{ComputeEngine, CpuEngine, PaletteTable, Slot};

use crate::explorer::Explorer;
use crate::script::Script;
use crate::settings::AppSettings;

#[derive(Args)]
pub struct ReplayArgs {
    /// Gesture script (JSON)
    pub script: PathBuf,

    /// Output file for the Mandelbrot view
    #[arg(short, long, default_value = "mandelbrot.png")]
    pub output: PathBuf,

    /// Output file for the Julia view, saved when Julia mode is on
    #[arg(long)]
    pub julia_out: Option<PathBuf>,
}

pub fn run(args: &ReplayArgs, settings: &mut AppSettings) -> Result<()> {
    let script = Script::load(&args.script)?;
    let mut explorer = Explorer::new(
        Arc::new(CpuEngine::new()),
        PaletteTable::standard(),
        settings,
    )
    .context("Failed to set up the explorer")?;

    let width = script.width.unwrap_or(settings.width);
    let height = script.height.unwrap_or(settings.height);
    explorer
        .resize(width, height)
        .context("Failed to start the render workers")?;
    script.run(&mut explorer)?;
    print_summary(&explorer);

    explorer
        .save_mandelbrot(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    println!("Saved {}", args.output.display());

    if let Some(path) = &args.julia_out {
        if explorer.julia_enabled() {
            explorer
                .save_julia(path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            println!("Saved {}", path.display());
        } else {
            warn!("Julia mode is off at the end of the script; not saving {}", path.display());
        }
    }

    *settings = explorer.settings();
    Ok(())
}

fn print_summary<E: ComputeEngine + 'static>(explorer: &Explorer<E>) {
    let palette = explorer.palettes().get(explorer.palette_index());
    println!("Palette:     {}", palette.name());
    println!("Iterations:  {}", explorer.mandelbrot().iterations());
    if let Some(bounds) = explorer.coordinates(Slot::Mandelbrot) {
        println!("Mandelbrot:  {} (extent {})", bounds.center(), bounds.width());
    }
    println!("Frames:      {}", explorer.frames(Slot::Mandelbrot));
    if explorer.julia_enabled() {
        println!(
            "Julia seed:  {} ({:?} mode)",
            explorer.julia().viewport().julia_seed(),
            explorer.seed_mode()
        );
        println!("Frames:      {}", explorer.frames(Slot::Julia));
    }
}
