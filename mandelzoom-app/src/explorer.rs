//! The two-view explorer: a Mandelbrot view and a linked Julia view sharing
//! one compute engine, one palette registry and one event channel.

use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use tracing::debug;

use mandelzoom_core::{
    Bounds, Complex, FractalKind, GestureResponse, PointerEvent, SurfaceSize, ViewportState,
};
use mandelzoom_render::{ComputeEngine, FractalView, PaletteTable, Slot, ViewEvent};

use crate::settings::{AppSettings, JuliaSeedMode};

pub struct Explorer<E: ComputeEngine + 'static> {
    mandelbrot: FractalView<E>,
    julia: FractalView<E>,
    palettes: PaletteTable,
    palette_index: usize,
    seed_mode: JuliaSeedMode,
    julia_enabled: bool,
    size: SurfaceSize,
    julia_size: u32,
    events: Receiver<ViewEvent>,
    frames: [u64; 2],
    coordinates: [Option<Bounds>; 2],
}

impl<E: ComputeEngine + 'static> Explorer<E> {
    /// Build both views from persisted settings. Nothing renders until the
    /// first [`resize`](Self::resize).
    pub fn new(
        engine: Arc<E>,
        palettes: PaletteTable,
        settings: &AppSettings,
    ) -> mandelzoom_render::Result<Self> {
        let (tx, events) = mpsc::channel();

        let mandel_vp =
            ViewportState::from_settings(FractalKind::Mandelbrot, &settings.mandelbrot);
        let mut julia_vp = ViewportState::from_settings(FractalKind::Julia, &settings.julia);
        if settings.julia_seed_mode == JuliaSeedMode::Crosshair {
            julia_vp.set_julia_seed(mandel_vp.center());
        }

        let mut mandelbrot = FractalView::with_viewport(mandel_vp, Arc::clone(&engine));
        let mut julia = FractalView::with_viewport(julia_vp, engine);
        mandelbrot.set_event_sender(tx.clone());
        julia.set_event_sender(tx);
        mandelbrot.set_point_reporting(settings.julia_enabled);
        julia.set_visible(settings.julia_enabled)?;

        let mut explorer = Self {
            mandelbrot,
            julia,
            palette_index: palettes.wrap_index(settings.mandelbrot.palette_index),
            palettes,
            seed_mode: settings.julia_seed_mode,
            julia_enabled: settings.julia_enabled,
            size: SurfaceSize::new(settings.width, settings.height),
            julia_size: settings.julia_size,
            events,
            frames: [0; 2],
            coordinates: [None; 2],
        };
        explorer.install_palettes();
        Ok(explorer)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn mandelbrot(&self) -> &FractalView<E> {
        &self.mandelbrot
    }

    pub fn julia(&self) -> &FractalView<E> {
        &self.julia
    }

    pub fn palettes(&self) -> &PaletteTable {
        &self.palettes
    }

    pub fn palette_index(&self) -> usize {
        self.palette_index
    }

    pub fn julia_enabled(&self) -> bool {
        self.julia_enabled
    }

    pub fn seed_mode(&self) -> JuliaSeedMode {
        self.seed_mode
    }

    pub fn set_seed_mode(&mut self, mode: JuliaSeedMode) {
        self.seed_mode = mode;
    }

    /// Number of frame updates seen for `slot` so far.
    pub fn frames(&self, slot: Slot) -> u64 {
        self.frames[slot.index()]
    }

    /// The last bounds announced by the view in `slot`.
    pub fn coordinates(&self, slot: Slot) -> Option<Bounds> {
        self.coordinates[slot.index()]
    }

    // -----------------------------------------------------------------------
    // Surfaces
    // -----------------------------------------------------------------------

    /// Size the Mandelbrot surface to `width` x `height` and the Julia
    /// surface to its configured square, rendering both.
    pub fn resize(&mut self, width: u32, height: u32) -> mandelzoom_render::Result<()> {
        self.size = SurfaceSize::new(width, height);
        self.mandelbrot.resize(width, height)?;
        self.julia.resize(self.julia_size, self.julia_size)?;
        self.process_events()
    }

    /// Block until both views have finished their sweeps.
    pub fn wait(&mut self) {
        self.mandelbrot.wait();
        self.julia.wait();
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Drain pending view events. A point selected in the Mandelbrot view
    /// re-seeds the Julia view while Julia mode is on.
    pub fn process_events(&mut self) -> mandelzoom_render::Result<()> {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ViewEvent::FrameUpdated { slot, .. } => self.frames[slot.index()] += 1,
                ViewEvent::CoordinatesChanged { slot, bounds } => {
                    self.coordinates[slot.index()] = Some(bounds);
                }
                ViewEvent::PointSelected {
                    slot: Slot::Mandelbrot,
                    point,
                } if self.julia_enabled => {
                    let seed = match self.seed_mode {
                        JuliaSeedMode::Crosshair => self.mandelbrot.viewport().bounds().center(),
                        JuliaSeedMode::Pointer => point,
                    };
                    self.seed_julia(seed)?;
                }
                ViewEvent::PointSelected { .. } => {}
            }
        }
        Ok(())
    }

    fn seed_julia(&mut self, seed: Complex) -> mandelzoom_render::Result<()> {
        debug!(seed = %seed, "Re-seeding Julia view");
        self.julia.set_julia_seed(seed)
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
    ) -> mandelzoom_render::Result<GestureResponse> {
        let response = self.mandelbrot.handle_pointer(event)?;
        self.process_events()?;
        Ok(response)
    }

    /// Pan and zoom inside the Julia view; the seed is unaffected.
    pub fn handle_julia_pointer(
        &mut self,
        event: &PointerEvent,
    ) -> mandelzoom_render::Result<GestureResponse> {
        let response = self.julia.handle_pointer(event)?;
        self.process_events()?;
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn install_palettes(&mut self) {
        let palette = self.palettes.get(self.palette_index);
        self.mandelbrot.set_palette(palette);
        self.julia.set_palette(&palette.shifted(palette.len() / 2));
    }

    /// Cycle to the next registered palette and re-render both views.
    pub fn next_palette(&mut self) -> mandelzoom_render::Result<()> {
        self.palette_index = self.palettes.next_index(self.palette_index);
        self.install_palettes();
        debug!(
            index = self.palette_index,
            name = self.palettes.get(self.palette_index).name(),
            "Palette changed"
        );
        self.mandelbrot.render()?;
        self.julia.render()
    }

    /// Apply one iteration budget to both views.
    pub fn set_iterations(&mut self, iterations: i64) -> mandelzoom_render::Result<()> {
        self.mandelbrot.set_iterations(iterations)?;
        self.julia.set_iterations(iterations)
    }

    /// Step the budget by a sixteenth of its value, at least one.
    pub fn step_iterations(&mut self, up: bool) -> mandelzoom_render::Result<()> {
        let current = i64::from(self.mandelbrot.iterations());
        let step = (current / 16).max(1);
        self.set_iterations(if up { current + step } else { current - step })
    }

    /// Slider position `progress` maps to `progress²` iterations.
    pub fn set_iterations_from_slider(&mut self, progress: u32) -> mandelzoom_render::Result<()> {
        let progress = i64::from(progress);
        self.set_iterations(progress * progress)
    }

    /// Show or hide the Julia view. While shown, the Mandelbrot view reports
    /// selected points so the Julia seed follows it.
    pub fn set_julia_enabled(&mut self, enabled: bool) -> mandelzoom_render::Result<()> {
        self.julia_enabled = enabled;
        self.mandelbrot.set_point_reporting(enabled);
        if enabled && self.seed_mode == JuliaSeedMode::Crosshair {
            let center = self.mandelbrot.viewport().bounds().center();
            self.seed_julia(center)?;
        }
        self.julia.set_visible(enabled)
    }

    pub fn toggle_julia(&mut self) -> mandelzoom_render::Result<bool> {
        self.set_julia_enabled(!self.julia_enabled)?;
        Ok(self.julia_enabled)
    }

    /// Reset both views to their default windows and budgets.
    pub fn reset(&mut self) -> mandelzoom_render::Result<()> {
        self.mandelbrot.reset()?;
        if self.julia_enabled && self.seed_mode == JuliaSeedMode::Crosshair {
            let center = self.mandelbrot.viewport().bounds().center();
            self.julia.set_julia_seed(center)?;
        }
        self.julia.reset()
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn save_mandelbrot(&self, path: &Path) -> mandelzoom_render::Result<()> {
        self.mandelbrot.save_png(path)
    }

    pub fn save_julia(&self, path: &Path) -> mandelzoom_render::Result<()> {
        self.julia.save_png(path)
    }

    /// Snapshot of everything that persists across runs.
    pub fn settings(&self) -> AppSettings {
        AppSettings {
            width: self.size.width,
            height: self.size.height,
            mandelbrot: self.mandelbrot.settings(self.palette_index),
            julia: self.julia.settings(self.palette_index),
            julia_enabled: self.julia_enabled,
            julia_size: self.julia_size,
            julia_seed_mode: self.seed_mode,
        }
    }
}
