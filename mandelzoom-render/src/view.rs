use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::{debug, info};

use mandelzoom_core::{
    Bounds, Complex, FractalKind, GestureResponse, GestureTransform, PointerAction, PointerEvent,
    SurfaceSize, ViewSettings, ViewportState,
};

use crate::buffer::Framebuffer;
use crate::engine::{ComputeEngine, EngineParams, Slot};
use crate::error::RenderError;
use crate::export::{export_png, ExportMetadata};
use crate::palette::Palette;
use crate::region::split_regions;
use crate::scheduler::{RenderScheduler, ViewEvent};

/// One interactive fractal view: viewport, gestures, surface, palette and
/// render scheduler for a single engine slot.
///
/// Every mutation that moves the view ends in [`render`](Self::render),
/// which supersedes whatever sweep was running.
pub struct FractalView<E: ComputeEngine + 'static> {
    viewport: ViewportState,
    gestures: GestureTransform,
    engine: Arc<E>,
    scheduler: RenderScheduler<E>,
    framebuffer: Option<Arc<Framebuffer>>,
    palette: Palette,
    visible: bool,
    events: Option<Sender<ViewEvent>>,
}

impl<E: ComputeEngine + 'static> FractalView<E> {
    /// A visible, unsized view at the default position for `kind`.
    pub fn new(kind: FractalKind, engine: Arc<E>) -> Self {
        Self::with_viewport(ViewportState::new(kind), engine)
    }

    pub fn with_viewport(viewport: ViewportState, engine: Arc<E>) -> Self {
        let slot = Slot::for_kind(viewport.kind());
        Self {
            viewport,
            gestures: GestureTransform::new(),
            scheduler: RenderScheduler::new(Arc::clone(&engine), slot),
            engine,
            framebuffer: None,
            palette: Palette::new("Interior", Vec::new()),
            visible: true,
            events: None,
        }
    }

    pub fn set_event_sender(&mut self, events: Sender<ViewEvent>) {
        self.scheduler.set_event_sender(Some(events.clone()));
        self.events = Some(events);
    }

    fn emit(&self, event: ViewEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn slot(&self) -> Slot {
        self.scheduler.slot()
    }

    pub fn kind(&self) -> FractalKind {
        self.viewport.kind()
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn framebuffer(&self) -> Option<&Arc<Framebuffer>> {
        self.framebuffer.as_ref()
    }

    pub fn scheduler(&self) -> &RenderScheduler<E> {
        &self.scheduler
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    // -----------------------------------------------------------------------
    // Surface
    // -----------------------------------------------------------------------

    /// React to a new surface size: cancel, re-derive the bounds, swap in a
    /// fresh framebuffer and render. A zero-sized surface unbinds the buffer
    /// and renders nothing until a real size arrives.
    pub fn resize(&mut self, width: u32, height: u32) -> crate::Result<()> {
        let size = self.viewport.size();
        if self.framebuffer.is_some() && size.width == width && size.height == height {
            return Ok(());
        }
        self.scheduler.terminate();
        if SurfaceSize::new(width, height).is_degenerate() {
            self.engine.release_surface(self.slot());
            self.framebuffer = None;
            return Ok(());
        }
        if !self.viewport.size().is_degenerate() {
            self.viewport.sync_center();
        }
        self.viewport.init_bounds(width, height);
        let framebuffer = Arc::new(Framebuffer::new(self.viewport.size()));
        self.engine.bind_surface(self.slot(), Arc::clone(&framebuffer));
        self.framebuffer = Some(framebuffer);
        debug!(slot = ?self.slot(), width, height, "Surface resized");
        self.render()
    }

    /// Cancel any running sweep and start a new one from the current
    /// viewport. Does nothing while hidden or without a surface.
    pub fn render(&mut self) -> crate::Result<()> {
        self.scheduler.terminate();
        if !self.visible || self.framebuffer.is_none() {
            return Ok(());
        }
        self.viewport.sync_center();
        self.emit(ViewEvent::CoordinatesChanged {
            slot: self.slot(),
            bounds: self.viewport.bounds(),
        });
        let regions = split_regions(self.viewport.kind(), self.viewport.size());
        if regions.is_empty() {
            return Ok(());
        }
        self.scheduler
            .launch(&EngineParams::from_viewport(&self.viewport), &regions)?;
        Ok(())
    }

    /// Cancel the running sweep. Returns whether every worker was joined.
    pub fn terminate(&mut self) -> bool {
        self.scheduler.terminate()
    }

    /// Block until the current sweep has run to its end.
    pub fn wait(&mut self) {
        self.scheduler.wait();
    }

    /// Publish the back buffer to the front buffer.
    pub fn refresh(&self) -> bool {
        self.engine.refresh_surface(self.slot())
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Report the point under the pointer on every move and release.
    pub fn set_point_reporting(&mut self, enabled: bool) {
        self.gestures.set_point_reporting(enabled);
    }

    /// Feed one pointer event: adjust the viewport and the sweep depth, emit
    /// any selected point, and re-render on move and release.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> crate::Result<GestureResponse> {
        let response = self.gestures.handle(event, &mut self.viewport);
        self.scheduler.coarseness().apply_hint(response.hint);
        if let Some(point) = response.selected {
            self.emit(ViewEvent::PointSelected {
                slot: self.slot(),
                point,
            });
        }
        if event.action != PointerAction::Down {
            self.render()?;
        }
        Ok(response)
    }

    /// Emit the current bounds without rendering.
    pub fn request_coordinates(&self) -> Bounds {
        let bounds = self.viewport.bounds();
        self.emit(ViewEvent::CoordinatesChanged {
            slot: self.slot(),
            bounds,
        });
        bounds
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    /// Back to the default window and budget for this kind.
    pub fn reset(&mut self) -> crate::Result<()> {
        self.viewport.reset();
        self.render()
    }

    pub fn iterations(&self) -> u32 {
        self.viewport.iterations()
    }

    /// Clamped to the supported range; re-renders.
    pub fn set_iterations(&mut self, iterations: i64) -> crate::Result<()> {
        self.viewport.set_iterations(iterations);
        self.render()
    }

    /// Move to a persisted centre/extent; re-renders.
    pub fn set_center(&mut self, center: Complex, extent: f64) -> crate::Result<()> {
        self.viewport.set_center(center, extent)?;
        self.render()
    }

    /// Install a palette for subsequent passes. Does not re-render.
    pub fn set_palette(&mut self, palette: &Palette) {
        self.engine.set_palette(self.slot(), palette);
        self.palette = palette.clone();
    }

    /// Stop the current sweep, re-seed and re-render.
    pub fn set_julia_seed(&mut self, seed: Complex) -> crate::Result<()> {
        self.scheduler.terminate();
        self.viewport.set_julia_seed(seed);
        self.render()
    }

    /// Hidden views never launch workers; showing a view renders it.
    pub fn set_visible(&mut self, visible: bool) -> crate::Result<()> {
        if self.visible == visible {
            return Ok(());
        }
        self.visible = visible;
        if visible {
            self.render()
        } else {
            self.scheduler.terminate();
            Ok(())
        }
    }

    pub fn settings(&self, palette_index: usize) -> ViewSettings {
        self.viewport.settings(palette_index)
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Encode the front buffer as a PNG at `path`.
    pub fn save_png(&self, path: &Path) -> crate::Result<()> {
        let framebuffer = self
            .framebuffer
            .as_ref()
            .ok_or(RenderError::NoSurface(self.slot().index()))?;
        let metadata = ExportMetadata::from_viewport(&self.viewport, self.palette.name());
        export_png(
            &framebuffer.to_rgba_bytes(),
            framebuffer.width(),
            framebuffer.height(),
            path,
            &metadata,
        )?;
        info!(path = %path.display(), kind = %self.kind(), "Saved picture");
        Ok(())
    }
}

impl<E: ComputeEngine + 'static> Drop for FractalView<E> {
    fn drop(&mut self) {
        self.scheduler.terminate();
        self.engine.release_surface(self.slot());
        self.engine.release_parameters(self.slot());
    }
}
