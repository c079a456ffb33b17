use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mandelzoom_core::{FractalKind, ViewSettings, ViewportState};
use mandelzoom_render::{CpuEngine, FractalView, PaletteTable};

use crate::settings::AppSettings;

#[derive(Args)]
pub struct RenderArgs {
    /// Render the Julia set instead of the Mandelbrot set
    #[arg(long)]
    pub julia: bool,

    /// Real part of the view centre
    #[arg(long, allow_hyphen_values = true)]
    pub center_re: Option<f64>,

    /// Imaginary part of the view centre
    #[arg(long, allow_hyphen_values = true)]
    pub center_im: Option<f64>,

    /// Width of the visible window in the complex plane
    #[arg(long)]
    pub extent: Option<f64>,

    /// Iteration limit (clamped to 2..=2048)
    #[arg(long, allow_hyphen_values = true)]
    pub iterations: Option<i64>,

    /// Palette index (see `mandelzoom palettes`); wraps around
    #[arg(long)]
    pub palette: Option<usize>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Real part of the Julia seed
    #[arg(long, allow_hyphen_values = true)]
    pub seed_re: Option<f64>,

    /// Imaginary part of the Julia seed
    #[arg(long, allow_hyphen_values = true)]
    pub seed_im: Option<f64>,

    /// Output file path
    #[arg(short, long, default_value = "mandelzoom.png")]
    pub output: PathBuf,
}

impl RenderArgs {
    fn kind(&self) -> FractalKind {
        if self.julia {
            FractalKind::Julia
        } else {
            FractalKind::Mandelbrot
        }
    }

    /// Overlay the command-line values on the persisted view.
    fn apply(&self, view: &mut ViewSettings) {
        if let Some(v) = self.center_re {
            view.center_re = v;
        }
        if let Some(v) = self.center_im {
            view.center_im = v;
        }
        if let Some(v) = self.extent {
            view.extent = v;
        }
        if let Some(v) = self.iterations {
            view.iterations = v;
        }
        if let Some(v) = self.palette {
            view.palette_index = v;
        }
        if let Some(v) = self.seed_re {
            view.julia_seed_re = v;
        }
        if let Some(v) = self.seed_im {
            view.julia_seed_im = v;
        }
    }
}

/// Run one full sweep and save it; the rendered view becomes the
/// persisted one.
pub fn run(args: &RenderArgs, settings: &mut AppSettings) -> Result<()> {
    let kind = args.kind();
    let width = args.width.unwrap_or(settings.width);
    let height = args.height.unwrap_or(settings.height);
    let view_settings = match kind {
        FractalKind::Mandelbrot => &mut settings.mandelbrot,
        FractalKind::Julia => &mut settings.julia,
    };
    args.apply(view_settings);

    let table = PaletteTable::standard();
    let palette_index = table.wrap_index(view_settings.palette_index);
    let palette = table.get(palette_index);

    let viewport = ViewportState::from_settings(kind, view_settings);
    let mut view = FractalView::with_viewport(viewport, Arc::new(CpuEngine::new()));
    match kind {
        FractalKind::Mandelbrot => view.set_palette(palette),
        FractalKind::Julia => view.set_palette(&palette.shifted(palette.len() / 2)),
    }

    let started = Instant::now();
    view.resize(width, height)
        .context("Failed to start the render workers")?;
    view.wait();
    info!(
        %kind,
        width,
        height,
        iterations = view.iterations(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Render finished"
    );

    view.save_png(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    println!("Saved {}", args.output.display());

    *view_settings = view.settings(palette_index);
    settings.width = width;
    settings.height = height;
    Ok(())
}
