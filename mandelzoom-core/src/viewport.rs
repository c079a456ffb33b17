use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::complex::Complex;
use crate::error::CoreError;
use crate::fractal::FractalKind;
use crate::settings::ViewSettings;

pub const MIN_ITERATIONS: u32 = 2;
pub const MAX_ITERATIONS: u32 = 2048;
pub const DEFAULT_ITERATIONS: u32 = 128;

pub const DEFAULT_CENTER: Complex = Complex { re: -0.5, im: 0.0 };
pub const DEFAULT_EXTENT: f64 = 3.0;
pub const DEFAULT_JULIA_CENTER: Complex = Complex { re: 0.0, im: 0.0 };
pub const DEFAULT_JULIA_EXTENT: f64 = 3.0;

/// Pixel dimensions of a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A surface with either side zero cannot be rendered into.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Width as a divisor; a zero width counts as one pixel.
    #[inline]
    fn width_divisor(&self) -> f64 {
        self.width.max(1) as f64
    }

    #[inline]
    fn height_divisor(&self) -> f64 {
        self.height.max(1) as f64
    }
}

/// Rectangular window on the complex plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> Complex {
        Complex::new(
            self.xmin + self.width() / 2.0,
            self.ymin + self.height() / 2.0,
        )
    }
}

/// The mapping between surface pixels and the complex plane for one view.
///
/// The bounds are the canonical representation while the user interacts;
/// centre and extent are the persisted form. `init_bounds` derives the
/// bounds from the centre, and `sync_center` derives the centre back from
/// the bounds before each render. Nothing writes both sides independently.
///
/// The imaginary axis is not flipped: pixel row 0 maps to `ymin`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    kind: FractalKind,
    center: Complex,
    extent: f64,
    bounds: Bounds,
    size: SurfaceSize,
    iterations: u32,
    julia_seed: Complex,
}

impl ViewportState {
    /// A viewport at the default position for `kind`, not yet sized.
    pub fn new(kind: FractalKind) -> Self {
        let mut state = Self {
            kind,
            center: DEFAULT_CENTER,
            extent: DEFAULT_EXTENT,
            bounds: Bounds {
                xmin: -1.0,
                xmax: 1.0,
                ymin: -1.0,
                ymax: 1.0,
            },
            size: SurfaceSize::default(),
            iterations: DEFAULT_ITERATIONS,
            julia_seed: Complex::ZERO,
        };
        state.reset();
        state
    }

    /// Restore a viewport from persisted settings.
    ///
    /// Out-of-range iteration counts are clamped; a non-positive extent
    /// falls back to the default for the kind.
    pub fn from_settings(kind: FractalKind, settings: &ViewSettings) -> Self {
        let mut state = Self::new(kind);
        state.center = Complex::new(settings.center_re, settings.center_im);
        if settings.extent > 0.0 && settings.extent.is_finite() {
            state.extent = settings.extent;
        } else {
            warn!(extent = settings.extent, %kind, "Ignoring invalid persisted extent");
        }
        state.set_iterations(settings.iterations);
        state.julia_seed = Complex::new(settings.julia_seed_re, settings.julia_seed_im);
        state.derive_bounds();
        state
    }

    pub fn kind(&self) -> FractalKind {
        self.kind
    }

    pub fn is_julia(&self) -> bool {
        self.kind.is_julia()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Centre as of the last `sync_center`, `reset`, or `set_center`.
    pub fn center(&self) -> Complex {
        self.center
    }

    /// Horizontal extent as of the last `sync_center`, `reset`, or `set_center`.
    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn julia_seed(&self) -> Complex {
        self.julia_seed
    }

    pub fn set_julia_seed(&mut self, seed: Complex) {
        self.julia_seed = seed;
    }

    /// Clamp and store the iteration budget. This is the only place the
    /// budget is clamped; every other path goes through here.
    pub fn set_iterations(&mut self, iterations: i64) {
        self.iterations =
            iterations.clamp(MIN_ITERATIONS as i64, MAX_ITERATIONS as i64) as u32;
    }

    /// Move the persisted centre/extent and re-derive the bounds.
    pub fn set_center(&mut self, center: Complex, extent: f64) -> crate::Result<()> {
        if !(extent > 0.0) || !extent.is_finite() {
            return Err(CoreError::InvalidExtent(extent));
        }
        self.center = center;
        self.extent = extent;
        self.derive_bounds();
        Ok(())
    }

    /// Size the viewport and derive the bounds from centre, extent and the
    /// surface aspect ratio. A degenerate surface leaves size and bounds as
    /// they were.
    pub fn init_bounds(&mut self, width: u32, height: u32) {
        let size = SurfaceSize::new(width, height);
        if size.is_degenerate() {
            return;
        }
        self.size = size;
        self.derive_bounds();
    }

    /// Bounds from centre and extent at the current aspect ratio. Until the
    /// viewport is first sized the window is square.
    fn derive_bounds(&mut self) {
        let ratio = if self.size.is_degenerate() {
            1.0
        } else {
            self.size.height as f64 / self.size.width_divisor()
        };
        let half = self.extent / 2.0;
        self.bounds = Bounds {
            xmin: self.center.re - half,
            xmax: self.center.re + half,
            ymin: self.center.im - ratio * half,
            ymax: self.center.im + ratio * half,
        };
    }

    /// Re-derive centre and extent from the current bounds.
    pub fn sync_center(&mut self) {
        self.extent = self.bounds.width();
        self.center = self.bounds.center();
    }

    /// Map a (possibly fractional) pixel position to the complex plane.
    #[inline]
    pub fn pixel_to_complex(&self, px: f64, py: f64) -> Complex {
        Complex::new(
            self.bounds.xmin + px * self.bounds.width() / self.size.width_divisor(),
            self.bounds.ymin + py * self.bounds.height() / self.size.height_divisor(),
        )
    }

    /// Inverse of [`pixel_to_complex`](Self::pixel_to_complex).
    #[inline]
    pub fn complex_to_pixel(&self, point: Complex) -> (f64, f64) {
        (
            (point.re - self.bounds.xmin) * self.size.width_divisor() / self.bounds.width(),
            (point.im - self.bounds.ymin) * self.size.height_divisor() / self.bounds.height(),
        )
    }

    /// Drag the plane by a pixel delta: content under the pointer follows it,
    /// so the window moves the opposite way.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let amount_x = dx / self.size.width_divisor() * self.bounds.width();
        let amount_y = dy / self.size.height_divisor() * self.bounds.height();
        self.bounds.xmin -= amount_x;
        self.bounds.xmax -= amount_x;
        self.bounds.ymin -= amount_y;
        self.bounds.ymax -= amount_y;
    }

    /// Zoom by `scale` around the point under pixel `(fx, fy)`.
    ///
    /// `scale > 1` zooms in. Non-positive or non-finite factors are ignored.
    /// Returns whether the bounds changed.
    pub fn zoom(&mut self, fx: f64, fy: f64, scale: f64) -> bool {
        if !(scale > 0.0) || !scale.is_finite() {
            return false;
        }
        let focus = self.pixel_to_complex(fx, fy);
        let b = &mut self.bounds;
        b.xmin = focus.re - (focus.re - b.xmin) / scale;
        b.xmax = focus.re + (b.xmax - focus.re) / scale;
        b.ymin = focus.im - (focus.im - b.ymin) / scale;
        b.ymax = focus.im + (b.ymax - focus.im) / scale;
        true
    }

    /// Return to the default window for this kind and the default budget.
    pub fn reset(&mut self) {
        let (center, extent) = match self.kind {
            FractalKind::Mandelbrot => (DEFAULT_CENTER, DEFAULT_EXTENT),
            FractalKind::Julia => (DEFAULT_JULIA_CENTER, DEFAULT_JULIA_EXTENT),
        };
        self.center = center;
        self.extent = extent;
        self.iterations = DEFAULT_ITERATIONS;
        self.derive_bounds();
    }

    /// Snapshot of the persisted fields.
    pub fn settings(&self, palette_index: usize) -> ViewSettings {
        ViewSettings {
            center_re: self.center.re,
            center_im: self.center.im,
            extent: self.extent,
            iterations: self.iterations as i64,
            palette_index,
            julia_seed_re: self.julia_seed.re,
            julia_seed_im: self.julia_seed.im,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn sized(kind: FractalKind, w: u32, h: u32) -> ViewportState {
        let mut vp = ViewportState::new(kind);
        vp.init_bounds(w, h);
        vp
    }

    #[test]
    fn default_mandelbrot_bounds() {
        let vp = sized(FractalKind::Mandelbrot, 400, 200);
        let b = vp.bounds();
        assert!((b.xmin - -2.0).abs() < EPSILON);
        assert!((b.xmax - 1.0).abs() < EPSILON);
        assert!((b.ymin - -0.75).abs() < EPSILON);
        assert!((b.ymax - 0.75).abs() < EPSILON);
        assert_eq!(vp.iterations(), DEFAULT_ITERATIONS);
    }

    #[test]
    fn default_julia_bounds_are_centred() {
        let vp = sized(FractalKind::Julia, 300, 300);
        let b = vp.bounds();
        assert!((b.xmin + 1.5).abs() < EPSILON);
        assert!((b.ymax - 1.5).abs() < EPSILON);
    }

    #[test]
    fn degenerate_surface_keeps_previous_bounds() {
        let mut vp = sized(FractalKind::Mandelbrot, 640, 480);
        let before = vp.bounds();
        vp.init_bounds(640, 0);
        vp.init_bounds(0, 10);
        assert_eq!(vp.bounds(), before);
        assert_eq!(vp.size(), SurfaceSize::new(640, 480));
        assert!(vp.bounds().ymax > vp.bounds().ymin);
    }

    #[test]
    fn unsized_viewport_has_square_window() {
        let mut vp = ViewportState::new(FractalKind::Mandelbrot);
        vp.init_bounds(0, 0);
        let b = vp.bounds();
        assert!((b.width() - DEFAULT_EXTENT).abs() < EPSILON);
        assert!((b.height() - DEFAULT_EXTENT).abs() < EPSILON);
        assert_eq!(b.center(), DEFAULT_CENTER);
    }

    #[test]
    fn aspect_follows_surface() {
        for &(w, h) in &[(1, 1), (640, 480), (480, 640), (1920, 7), (3, 4000)] {
            let vp = sized(FractalKind::Mandelbrot, w, h);
            let b = vp.bounds();
            let ratio = b.height() / b.width();
            assert!((ratio - h as f64 / w as f64).abs() < 1e-9, "{w}x{h}");
        }
    }

    #[test]
    fn pixel_mapping_corners() {
        let vp = sized(FractalKind::Julia, 100, 100);
        let tl = vp.pixel_to_complex(0.0, 0.0);
        assert!((tl.re + 1.5).abs() < EPSILON);
        assert!((tl.im + 1.5).abs() < EPSILON);
        let mid = vp.pixel_to_complex(50.0, 50.0);
        assert!(mid.re.abs() < EPSILON && mid.im.abs() < EPSILON);
    }

    #[test]
    fn round_trip_pixel_complex() {
        let mut vp = sized(FractalKind::Mandelbrot, 640, 360);
        vp.zoom(100.0, 50.0, 37.5);
        vp.pan(-13.0, 7.0);
        for &(px, py) in &[(0.0, 0.0), (639.0, 359.0), (320.5, 17.25), (1.0, 358.0)] {
            let c = vp.pixel_to_complex(px, py);
            let (rx, ry) = vp.complex_to_pixel(c);
            assert!((rx - px).abs() < 1e-6, "x {px} -> {rx}");
            assert!((ry - py).abs() < 1e-6, "y {py} -> {ry}");
        }
    }

    #[test]
    fn zoom_keeps_focus_fixed() {
        for &scale in &[0.25, 0.9, 1.0, 1.7, 40.0] {
            let mut vp = sized(FractalKind::Mandelbrot, 800, 600);
            let before = vp.pixel_to_complex(123.0, 456.0);
            assert!(vp.zoom(123.0, 456.0, scale));
            let after = vp.pixel_to_complex(123.0, 456.0);
            assert!((before.re - after.re).abs() < 1e-12, "scale {scale}");
            assert!((before.im - after.im).abs() < 1e-12, "scale {scale}");
        }
    }

    #[test]
    fn zoom_in_shrinks_extent() {
        let mut vp = sized(FractalKind::Mandelbrot, 800, 600);
        let w = vp.bounds().width();
        vp.zoom(400.0, 300.0, 2.0);
        assert!((vp.bounds().width() - w / 2.0).abs() < EPSILON);
    }

    #[test]
    fn invalid_zoom_is_ignored() {
        let mut vp = sized(FractalKind::Mandelbrot, 800, 600);
        let before = vp.bounds();
        assert!(!vp.zoom(10.0, 10.0, 0.0));
        assert!(!vp.zoom(10.0, 10.0, -2.0));
        assert!(!vp.zoom(10.0, 10.0, f64::NAN));
        assert!(!vp.zoom(10.0, 10.0, f64::INFINITY));
        assert_eq!(vp.bounds(), before);
    }

    #[test]
    fn pan_moves_window_against_drag() {
        let mut vp = sized(FractalKind::Mandelbrot, 300, 300);
        vp.set_iterations(500);
        let before = vp.bounds();
        vp.pan(30.0, -15.0);
        let after = vp.bounds();
        assert!((after.xmin - (before.xmin - 0.3)).abs() < EPSILON);
        assert!((after.ymin - (before.ymin + 0.15)).abs() < EPSILON);
        assert!((after.width() - before.width()).abs() < EPSILON);
        assert_eq!(vp.iterations(), 500);
    }

    #[test]
    fn iteration_clamping() {
        let mut vp = ViewportState::new(FractalKind::Mandelbrot);
        vp.set_iterations(1);
        assert_eq!(vp.iterations(), 2);
        vp.set_iterations(5000);
        assert_eq!(vp.iterations(), 2048);
        vp.set_iterations(-7);
        assert_eq!(vp.iterations(), MIN_ITERATIONS);
        vp.set_iterations(300);
        assert_eq!(vp.iterations(), 300);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut vp = sized(FractalKind::Julia, 200, 100);
        vp.zoom(10.0, 10.0, 5.0);
        vp.set_iterations(900);
        vp.reset();
        assert_eq!(vp.iterations(), DEFAULT_ITERATIONS);
        assert_eq!(vp.center(), DEFAULT_JULIA_CENTER);
        assert!((vp.bounds().width() - DEFAULT_JULIA_EXTENT).abs() < EPSILON);
    }

    #[test]
    fn sync_center_tracks_bounds() {
        let mut vp = sized(FractalKind::Mandelbrot, 400, 400);
        vp.pan(-100.0, 0.0);
        vp.zoom(200.0, 200.0, 2.0);
        vp.sync_center();
        assert!((vp.center().re - 0.25).abs() < EPSILON);
        assert!((vp.extent() - 1.5).abs() < EPSILON);
    }

    #[test]
    fn set_center_rejects_bad_extent() {
        let mut vp = sized(FractalKind::Mandelbrot, 10, 10);
        assert!(vp.set_center(Complex::ZERO, 0.0).is_err());
        assert!(vp.set_center(Complex::ZERO, f64::NAN).is_err());
        assert!(vp.set_center(Complex::new(1.0, 1.0), 2.0).is_ok());
        assert!((vp.bounds().xmin - 0.0).abs() < EPSILON);
    }
}
