//! Pointer gestures to viewport mutations.
//!
//! One pointer drags the plane and two pointers pinch-zoom it. Every
//! processed event also says how detailed the following render should be:
//! coarse while a finger is on the surface, full detail once it lifts.

use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::viewport::ViewportState;

/// A position on the drawing surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    fn distance(self, other: Self) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// One raw pointer sample.
///
/// `secondary` is present while a second finger is down; its presence on a
/// `Move` turns the gesture into a pinch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub primary: PixelPoint,
    #[serde(default)]
    pub secondary: Option<PixelPoint>,
}

impl PointerEvent {
    pub fn down(x: f32, y: f32) -> Self {
        Self::single(PointerAction::Down, x, y)
    }

    pub fn drag(x: f32, y: f32) -> Self {
        Self::single(PointerAction::Move, x, y)
    }

    pub fn pinch(a: PixelPoint, b: PixelPoint) -> Self {
        Self {
            action: PointerAction::Move,
            primary: a,
            secondary: Some(b),
        }
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::single(PointerAction::Up, x, y)
    }

    fn single(action: PointerAction, x: f32, y: f32) -> Self {
        Self {
            action,
            primary: PixelPoint::new(x, y),
            secondary: None,
        }
    }
}

/// How far the next progressive sweep should refine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarsenessHint {
    /// A gesture is in progress: one coarse pass only.
    Coarse,
    /// The gesture ended: sweep down to single pixels.
    Fine,
}

/// What handling one event produced besides the viewport mutation itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureResponse {
    pub hint: CoarsenessHint,
    /// The complex point under the primary pointer, reported on move and
    /// up events when point reporting is enabled.
    pub selected: Option<Complex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TouchMode {
    None,
    Drag,
    Pinch,
}

/// Turns a pointer stream into pan/zoom calls on a [`ViewportState`].
///
/// Pans use the delta between consecutive samples, never the total since
/// touch-down, so a long drag cannot apply the same motion twice. A pinch
/// zooms by the ratio of consecutive finger distances around their midpoint.
#[derive(Debug, Clone)]
pub struct GestureTransform {
    mode: TouchMode,
    previous: PixelPoint,
    pinch_distance: f64,
    report_points: bool,
}

impl GestureTransform {
    pub fn new() -> Self {
        Self {
            mode: TouchMode::None,
            previous: PixelPoint::default(),
            pinch_distance: 0.0,
            report_points: false,
        }
    }

    /// Enable "point selected" reporting, used when a companion Julia view
    /// follows this one.
    pub fn with_point_reporting(mut self, enabled: bool) -> Self {
        self.report_points = enabled;
        self
    }

    pub fn set_point_reporting(&mut self, enabled: bool) {
        self.report_points = enabled;
    }

    /// Apply one event to `viewport`.
    pub fn handle(&mut self, event: &PointerEvent, viewport: &mut ViewportState) -> GestureResponse {
        match event.action {
            PointerAction::Down => {
                self.previous = event.primary;
                GestureResponse {
                    hint: CoarsenessHint::Coarse,
                    selected: None,
                }
            }
            PointerAction::Move => {
                match event.secondary {
                    None => self.drag(event.primary, viewport),
                    Some(second) => self.pinch(event.primary, second, viewport),
                }
                GestureResponse {
                    hint: CoarsenessHint::Coarse,
                    selected: self.selection(event.primary, viewport),
                }
            }
            PointerAction::Up | PointerAction::Cancel => {
                self.mode = TouchMode::None;
                GestureResponse {
                    hint: CoarsenessHint::Fine,
                    selected: self.selection(event.primary, viewport),
                }
            }
        }
    }

    fn drag(&mut self, at: PixelPoint, viewport: &mut ViewportState) {
        // Coming out of a pinch (or a missed down), restart from here.
        if self.mode != TouchMode::Drag {
            self.previous = at;
        }
        self.mode = TouchMode::Drag;
        let dx = at.x - self.previous.x;
        let dy = at.y - self.previous.y;
        self.previous = at;
        viewport.pan(dx as f64, dy as f64);
    }

    fn pinch(&mut self, a: PixelPoint, b: PixelPoint, viewport: &mut ViewportState) {
        let center = a.midpoint(b);
        let distance = a.distance(b);
        self.previous = center;
        if self.mode != TouchMode::Pinch {
            self.mode = TouchMode::Pinch;
            self.pinch_distance = distance;
            return;
        }
        let scale = distance / self.pinch_distance;
        self.pinch_distance = distance;
        // The viewport ignores non-positive and non-finite factors.
        viewport.zoom(center.x as f64, center.y as f64, scale);
    }

    fn selection(&self, at: PixelPoint, viewport: &ViewportState) -> Option<Complex> {
        self.report_points
            .then(|| viewport.pixel_to_complex(at.x as f64, at.y as f64))
    }
}

impl Default for GestureTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fractal::FractalKind;

    const EPSILON: f64 = 1e-9;

    fn viewport() -> ViewportState {
        let mut vp = ViewportState::new(FractalKind::Mandelbrot);
        vp.init_bounds(300, 300);
        vp
    }

    #[test]
    fn down_requests_coarse_without_moving() {
        let mut vp = viewport();
        let before = vp.bounds();
        let mut g = GestureTransform::new();
        let r = g.handle(&PointerEvent::down(10.0, 10.0), &mut vp);
        assert_eq!(r.hint, CoarsenessHint::Coarse);
        assert_eq!(r.selected, None);
        assert_eq!(vp.bounds(), before);
    }

    #[test]
    fn drag_uses_incremental_deltas() {
        let mut vp = viewport();
        let start = vp.bounds();
        let mut g = GestureTransform::new();
        g.handle(&PointerEvent::down(100.0, 100.0), &mut vp);
        g.handle(&PointerEvent::drag(110.0, 100.0), &mut vp);
        g.handle(&PointerEvent::drag(120.0, 100.0), &mut vp);
        g.handle(&PointerEvent::drag(130.0, 100.0), &mut vp);
        let r = g.handle(&PointerEvent::up(130.0, 100.0), &mut vp);
        assert_eq!(r.hint, CoarsenessHint::Fine);

        // The first move only anchors the drag; two 10 px steps follow.
        let shifted = start.xmin - vp.bounds().xmin;
        assert!((shifted - 20.0 / 300.0 * 3.0).abs() < EPSILON, "{shifted}");
        assert!((vp.bounds().ymin - start.ymin).abs() < EPSILON);
    }

    #[test]
    fn pinch_zooms_around_midpoint() {
        let mut vp = viewport();
        let mut g = GestureTransform::new();
        let a = PixelPoint::new(100.0, 150.0);
        let b = PixelPoint::new(200.0, 150.0);
        let focus_before = vp.pixel_to_complex(150.0, 150.0);
        let width_before = vp.bounds().width();

        g.handle(&PointerEvent::pinch(a, b), &mut vp);
        assert!((vp.bounds().width() - width_before).abs() < EPSILON);

        g.handle(
            &PointerEvent::pinch(PixelPoint::new(50.0, 150.0), PixelPoint::new(250.0, 150.0)),
            &mut vp,
        );
        assert!((vp.bounds().width() - width_before / 2.0).abs() < EPSILON);
        let focus_after = vp.pixel_to_complex(150.0, 150.0);
        assert!((focus_after.re - focus_before.re).abs() < EPSILON);
        assert!((focus_after.im - focus_before.im).abs() < EPSILON);
    }

    #[test]
    fn pinch_scale_is_relative_to_previous_sample() {
        let mut vp = viewport();
        let mut g = GestureTransform::new();
        let w0 = vp.bounds().width();
        for d in [100.0f32, 200.0, 400.0] {
            g.handle(
                &PointerEvent::pinch(
                    PixelPoint::new(150.0 - d / 2.0, 150.0),
                    PixelPoint::new(150.0 + d / 2.0, 150.0),
                ),
                &mut vp,
            );
        }
        assert!((vp.bounds().width() - w0 / 4.0).abs() < EPSILON);
    }

    #[test]
    fn collapsed_pinch_is_ignored() {
        let mut vp = viewport();
        let mut g = GestureTransform::new();
        let p = PixelPoint::new(150.0, 150.0);
        g.handle(&PointerEvent::pinch(p, p), &mut vp);
        let before = vp.bounds();
        g.handle(&PointerEvent::pinch(p, p), &mut vp);
        g.handle(
            &PointerEvent::pinch(PixelPoint::new(140.0, 150.0), PixelPoint::new(160.0, 150.0)),
            &mut vp,
        );
        assert_eq!(vp.bounds(), before);
    }

    #[test]
    fn drag_after_pinch_does_not_jump() {
        let mut vp = viewport();
        let mut g = GestureTransform::new();
        g.handle(
            &PointerEvent::pinch(PixelPoint::new(0.0, 0.0), PixelPoint::new(100.0, 0.0)),
            &mut vp,
        );
        let before = vp.bounds();
        g.handle(&PointerEvent::drag(280.0, 290.0), &mut vp);
        assert_eq!(vp.bounds(), before);
    }

    #[test]
    fn point_reporting_on_move_and_up() {
        let mut vp = viewport();
        let mut g = GestureTransform::new().with_point_reporting(true);
        assert_eq!(g.handle(&PointerEvent::down(0.0, 0.0), &mut vp).selected, None);
        let tap = g.handle(&PointerEvent::up(150.0, 150.0), &mut vp);
        let c = tap.selected.expect("up should report a point");
        assert!((c.re - -0.5).abs() < EPSILON);
        assert!(c.im.abs() < EPSILON);

        g.set_point_reporting(false);
        assert_eq!(g.handle(&PointerEvent::drag(1.0, 1.0), &mut vp).selected, None);
    }

    #[test]
    fn pointer_events_deserialize() {
        let e: PointerEvent =
            serde_json::from_str(r#"{ "action": "move", "primary": { "x": 1.0, "y": 2.0 } }"#)
                .unwrap();
        assert_eq!(e, PointerEvent::drag(1.0, 2.0));
    }
}
