//! The fractal compute engine: per-view parameter slots and block drawing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use mandelzoom_core::{
    Bounds, Complex, Fractal, FractalKind, IterationResult, Julia, Mandelbrot, SurfaceSize,
    ViewportState,
};

use crate::buffer::{Framebuffer, Generation};
use crate::palette::{Palette, INTERIOR_COLOR};
use crate::region::Region;

// ---------------------------------------------------------------------------
// Slots and parameters
// ---------------------------------------------------------------------------

/// Which of the two concurrently live views a call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Mandelbrot = 0,
    Julia = 1,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Mandelbrot, Slot::Julia];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn for_kind(kind: FractalKind) -> Self {
        match kind {
            FractalKind::Mandelbrot => Slot::Mandelbrot,
            FractalKind::Julia => Slot::Julia,
        }
    }
}

/// Everything a block computation needs to know about the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    pub kind: FractalKind,
    pub iterations: u32,
    pub bounds: Bounds,
    pub julia_seed: Complex,
    pub size: SurfaceSize,
}

impl EngineParams {
    pub fn from_viewport(viewport: &ViewportState) -> Self {
        Self {
            kind: viewport.kind(),
            iterations: viewport.iterations(),
            bounds: viewport.bounds(),
            julia_seed: viewport.julia_seed(),
            size: viewport.size(),
        }
    }

    #[inline]
    fn x_scale(&self) -> f64 {
        self.bounds.width() / self.size.width.max(1) as f64
    }

    #[inline]
    fn y_scale(&self) -> f64 {
        self.bounds.height() / self.size.height.max(1) as f64
    }
}

/// One pass over a region at a given block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub region: Region,
    /// Edge length in pixels of the square painted per sample.
    pub coarseness: u32,
    /// The first pass of a sweep repaints every block; later passes skip
    /// samples that coincide with the previous, coarser pass.
    pub first_pass: bool,
}

/// What became of a `draw_block` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block landed in the back buffer.
    Committed,
    /// A newer generation was configured; nothing was written.
    Stale,
    /// Abort was requested mid-block; nothing was written.
    Aborted,
    /// No surface is bound to the slot.
    NoSurface,
    /// `configure` has not been called (or parameters were released).
    Unconfigured,
}

// ---------------------------------------------------------------------------
// Engine trait
// ---------------------------------------------------------------------------

/// The contract the render scheduler drives.
///
/// Every method takes a [`Slot`]; slots share no mutable state, so the
/// Mandelbrot and Julia views can render at the same time.
pub trait ComputeEngine: Send + Sync {
    /// Install new parameters and start a new generation. Clears any pending
    /// abort request. Returns the generation block draws must carry.
    fn configure(&self, slot: Slot, params: &EngineParams) -> Generation;

    /// Compute `block` and write it into the bound surface.
    fn draw_block(&self, slot: Slot, generation: Generation, block: &Block) -> BlockOutcome;

    /// Attach a fresh surface. Starts a new generation, so blocks from any
    /// earlier session can never land in it.
    fn bind_surface(&self, slot: Slot, surface: Arc<Framebuffer>);

    /// Publish the back buffer of the bound surface. Returns false when no
    /// surface is bound.
    fn refresh_surface(&self, slot: Slot) -> bool;

    fn release_surface(&self, slot: Slot);

    fn set_palette(&self, slot: Slot, palette: &Palette);

    /// Ask any running `draw_block` on this slot to stop soon.
    fn request_abort(&self, slot: Slot);

    fn release_parameters(&self, slot: Slot);
}

// ---------------------------------------------------------------------------
// CPU engine
// ---------------------------------------------------------------------------

struct EngineSlot {
    params: RwLock<Option<EngineParams>>,
    generation: AtomicU64,
    palette: RwLock<Arc<Palette>>,
    surface: RwLock<Option<Arc<Framebuffer>>>,
    abort: AtomicBool,
}

impl EngineSlot {
    fn new() -> Self {
        Self {
            params: RwLock::new(None),
            generation: AtomicU64::new(0),
            palette: RwLock::new(Arc::new(Palette::new("Interior", Vec::new()))),
            surface: RwLock::new(None),
            abort: AtomicBool::new(false),
        }
    }

    fn params(&self) -> Option<EngineParams> {
        *self.params.read().unwrap_or_else(|e| e.into_inner())
    }

    fn surface(&self) -> Option<Arc<Framebuffer>> {
        self.surface.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn palette(&self) -> Arc<Palette> {
        Arc::clone(&self.palette.read().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Reference escape-time engine running on the calling thread.
pub struct CpuEngine {
    slots: [EngineSlot; 2],
}

impl CpuEngine {
    pub fn new() -> Self {
        Self {
            slots: [EngineSlot::new(), EngineSlot::new()],
        }
    }

    fn slot(&self, slot: Slot) -> &EngineSlot {
        &self.slots[slot.index()]
    }
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeEngine for CpuEngine {
    fn configure(&self, slot: Slot, params: &EngineParams) -> Generation {
        let s = self.slot(slot);
        *s.params.write().unwrap_or_else(|e| e.into_inner()) = Some(*params);
        let generation = s.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(surface) = s.surface() {
            surface.set_generation(generation);
        }
        s.abort.store(false, Ordering::SeqCst);
        debug!(?slot, generation, iterations = params.iterations, "Engine configured");
        generation
    }

    fn draw_block(&self, slot: Slot, generation: Generation, block: &Block) -> BlockOutcome {
        let s = self.slot(slot);
        let Some(params) = s.params() else {
            warn!(?slot, "draw_block before configure");
            return BlockOutcome::Unconfigured;
        };
        let Some(surface) = s.surface() else {
            error!(?slot, "pixel buffer is null, cannot draw");
            return BlockOutcome::NoSurface;
        };
        if s.generation.load(Ordering::SeqCst) != generation {
            return BlockOutcome::Stale;
        }
        let region = block.region.clip_to(surface.size());
        if region.is_empty() || block.coarseness == 0 {
            return BlockOutcome::Committed;
        }

        let mut pixels = surface.read_region(region);
        let palette = s.palette();
        let pass = BlockPass {
            params: &params,
            palette: &palette,
            region,
            block,
            abort: &s.abort,
        };
        let finished = match params.kind {
            FractalKind::Mandelbrot => pass.fill(&Mandelbrot::new(params.iterations), &mut pixels),
            FractalKind::Julia => {
                pass.fill(&Julia::new(params.julia_seed, params.iterations), &mut pixels)
            }
        };
        if !finished {
            return BlockOutcome::Aborted;
        }
        if surface.commit_region(generation, region, &pixels) {
            BlockOutcome::Committed
        } else {
            debug!(?slot, generation, "Discarded stale block");
            BlockOutcome::Stale
        }
    }

    fn bind_surface(&self, slot: Slot, surface: Arc<Framebuffer>) {
        let s = self.slot(slot);
        let mut bound = s.surface.write().unwrap_or_else(|e| e.into_inner());
        let generation = s.generation.fetch_add(1, Ordering::SeqCst) + 1;
        surface.set_generation(generation);
        *bound = Some(surface);
    }

    fn refresh_surface(&self, slot: Slot) -> bool {
        match self.slot(slot).surface() {
            Some(surface) => {
                surface.publish();
                true
            }
            None => false,
        }
    }

    fn release_surface(&self, slot: Slot) {
        *self.slot(slot).surface.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn set_palette(&self, slot: Slot, palette: &Palette) {
        *self.slot(slot).palette.write().unwrap_or_else(|e| e.into_inner()) =
            Arc::new(palette.clone());
    }

    fn request_abort(&self, slot: Slot) {
        self.slot(slot).abort.store(true, Ordering::SeqCst);
    }

    fn release_parameters(&self, slot: Slot) {
        *self.slot(slot).params.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

// ---------------------------------------------------------------------------
// Block fill
// ---------------------------------------------------------------------------

struct BlockPass<'a> {
    params: &'a EngineParams,
    palette: &'a Palette,
    region: Region,
    block: &'a Block,
    abort: &'a AtomicBool,
}

impl BlockPass<'_> {
    /// Sample every `coarseness`-th pixel of the region and paint the
    /// sample's colour over its square, clipped to the region. `pixels` is
    /// the region's current content, row-major. Returns false if aborted.
    fn fill<F: Fractal>(&self, fractal: &F, pixels: &mut [u32]) -> bool {
        let step = self.block.coarseness as usize;
        let (w, h) = (self.region.width as usize, self.region.height as usize);
        let (x_scale, y_scale) = (self.params.x_scale(), self.params.y_scale());
        let bounds = self.params.bounds;
        let max = fractal.max_iterations();

        for (yi, py) in (0..h).step_by(step).enumerate() {
            let im = bounds.ymin + (self.region.y as usize + py) as f64 * y_scale;
            for (xi, px) in (0..w).step_by(step).enumerate() {
                if !self.block.first_pass && xi % 2 == 0 && yi % 2 == 0 {
                    continue;
                }
                let re = bounds.xmin + (self.region.x as usize + px) as f64 * x_scale;
                let color = match fractal.iterate(Complex::new(re, im)) {
                    IterationResult::Escaped { iterations } => {
                        self.palette.escape_color(iterations, max)
                    }
                    IterationResult::Interior => INTERIOR_COLOR,
                };
                for row in py..(py + step).min(h) {
                    pixels[row * w + px..row * w + (px + step).min(w)].fill(color);
                }
            }
            if self.abort.load(Ordering::Relaxed) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteTable;

    fn setup(kind: FractalKind, w: u32, h: u32) -> (CpuEngine, Arc<Framebuffer>, Generation) {
        let engine = CpuEngine::new();
        let mut vp = ViewportState::new(kind);
        vp.set_julia_seed(Complex::new(-0.5, 0.3));
        vp.init_bounds(w, h);
        let slot = Slot::for_kind(kind);
        let fb = Arc::new(Framebuffer::new(vp.size()));
        engine.bind_surface(slot, Arc::clone(&fb));
        engine.set_palette(slot, PaletteTable::standard().get(0));
        let generation = engine.configure(slot, &EngineParams::from_viewport(&vp));
        (engine, fb, generation)
    }

    fn full_pass(fb: &Framebuffer, coarseness: u32, first_pass: bool) -> Block {
        Block {
            region: Region::full(fb.size()),
            coarseness,
            first_pass,
        }
    }

    #[test]
    fn coarse_pass_paints_uniform_blocks() {
        let (engine, fb, g) = setup(FractalKind::Mandelbrot, 64, 48);
        let outcome = engine.draw_block(Slot::Mandelbrot, g, &full_pass(&fb, 16, true));
        assert_eq!(outcome, BlockOutcome::Committed);
        let px = fb.read_region(Region::full(fb.size()));
        for by in (0..48).step_by(16) {
            for bx in (0..64).step_by(16) {
                let c = px[by * 64 + bx];
                for y in by..by + 16 {
                    for x in bx..bx + 16 {
                        assert_eq!(px[y * 64 + x], c, "block ({bx},{by})");
                    }
                }
            }
        }
    }

    #[test]
    fn progressive_sweep_matches_single_fine_pass() {
        let (engine, fb, g) = setup(FractalKind::Mandelbrot, 40, 30);
        let mut level = 8;
        let mut first = true;
        loop {
            engine.draw_block(Slot::Mandelbrot, g, &full_pass(&fb, level, first));
            first = false;
            if level <= 1 {
                break;
            }
            level /= 2;
        }
        let swept = fb.read_region(Region::full(fb.size()));

        let (engine, fb, g) = setup(FractalKind::Mandelbrot, 40, 30);
        engine.draw_block(Slot::Mandelbrot, g, &full_pass(&fb, 1, true));
        assert_eq!(swept, fb.read_region(Region::full(fb.size())));
    }

    #[test]
    fn refinement_keeps_previous_samples() {
        let (engine, fb, g) = setup(FractalKind::Mandelbrot, 4, 4);
        let before = vec![0xFF12_3456; 16];
        assert!(fb.commit_region(g, Region::full(fb.size()), &before));
        engine.draw_block(Slot::Mandelbrot, g, &full_pass(&fb, 2, false));
        let after = fb.read_region(Region::full(fb.size()));
        // Sample (0,0) coincides with the coarser pass and is left alone.
        assert_eq!(after[0], 0xFF12_3456);
        assert_eq!(after[5], 0xFF12_3456);
        assert_ne!(after[2], 0xFF12_3456);
    }

    #[test]
    fn stale_generation_is_not_drawn() {
        let (engine, fb, g) = setup(FractalKind::Julia, 20, 20);
        let mut vp = ViewportState::new(FractalKind::Julia);
        vp.init_bounds(20, 20);
        let newer = engine.configure(Slot::Julia, &EngineParams::from_viewport(&vp));
        assert_eq!(newer, g + 1);
        assert_eq!(
            engine.draw_block(Slot::Julia, g, &full_pass(&fb, 1, true)),
            BlockOutcome::Stale
        );
        assert_eq!(fb.generation(), newer);
    }

    #[test]
    fn rebinding_a_surface_retires_the_running_generation() {
        let (engine, _old, g) = setup(FractalKind::Mandelbrot, 16, 16);
        let fresh = Arc::new(Framebuffer::new(SurfaceSize::new(32, 32)));
        engine.bind_surface(Slot::Mandelbrot, Arc::clone(&fresh));
        assert_eq!(fresh.generation(), g + 1);

        let block = Block {
            region: Region::new(0, 0, 16, 16),
            coarseness: 1,
            first_pass: true,
        };
        assert_eq!(engine.draw_block(Slot::Mandelbrot, g, &block), BlockOutcome::Stale);
        fresh.publish();
        assert!(fresh.front_pixels().iter().all(|&c| c == INTERIOR_COLOR));
    }

    #[test]
    fn abort_prevents_commit_and_configure_clears_it() {
        let (engine, fb, g) = setup(FractalKind::Mandelbrot, 16, 16);
        engine.request_abort(Slot::Mandelbrot);
        assert_eq!(
            engine.draw_block(Slot::Mandelbrot, g, &full_pass(&fb, 1, true)),
            BlockOutcome::Aborted
        );
        fb.publish();
        assert!(fb.front_pixels().iter().all(|&c| c == INTERIOR_COLOR));

        let mut vp = ViewportState::new(FractalKind::Mandelbrot);
        vp.init_bounds(16, 16);
        let g = engine.configure(Slot::Mandelbrot, &EngineParams::from_viewport(&vp));
        assert_eq!(
            engine.draw_block(Slot::Mandelbrot, g, &full_pass(&fb, 1, true)),
            BlockOutcome::Committed
        );
    }

    #[test]
    fn slots_are_independent() {
        let (engine, _fb, _) = setup(FractalKind::Mandelbrot, 8, 8);
        engine.request_abort(Slot::Julia);
        let julia = Arc::new(Framebuffer::new(SurfaceSize::new(8, 8)));
        engine.bind_surface(Slot::Julia, Arc::clone(&julia));
        let block = full_pass(&julia, 1, true);
        assert_eq!(engine.draw_block(Slot::Julia, 0, &block), BlockOutcome::Unconfigured);
        assert!(engine.refresh_surface(Slot::Mandelbrot));

        engine.release_surface(Slot::Julia);
        assert!(!engine.refresh_surface(Slot::Julia));
        engine.release_parameters(Slot::Mandelbrot);
        let mandel = Block {
            region: Region::new(0, 0, 8, 8),
            coarseness: 1,
            first_pass: true,
        };
        assert_eq!(
            engine.draw_block(Slot::Mandelbrot, 1, &mandel),
            BlockOutcome::Unconfigured
        );
    }

    #[test]
    fn missing_surface_is_reported() {
        let engine = CpuEngine::new();
        let mut vp = ViewportState::new(FractalKind::Mandelbrot);
        vp.init_bounds(8, 8);
        let g = engine.configure(Slot::Mandelbrot, &EngineParams::from_viewport(&vp));
        let block = Block {
            region: Region::new(0, 0, 8, 8),
            coarseness: 4,
            first_pass: true,
        };
        assert_eq!(engine.draw_block(Slot::Mandelbrot, g, &block), BlockOutcome::NoSurface);
    }

    #[test]
    fn julia_render_has_interior_and_escapes() {
        let (engine, fb, g) = setup(FractalKind::Julia, 60, 60);
        engine.draw_block(Slot::Julia, g, &full_pass(&fb, 1, true));
        let px = fb.read_region(Region::full(fb.size()));
        assert!(px.iter().any(|&c| c == INTERIOR_COLOR));
        assert!(px.iter().any(|&c| c != INTERIOR_COLOR));
    }
}
