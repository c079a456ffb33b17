pub mod complex;
pub mod error;
pub mod fractal;
pub mod gesture;
pub mod julia;
pub mod mandelbrot;
pub mod settings;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use error::CoreError;
pub use fractal::{Fractal, FractalKind, IterationResult};
pub use gesture::{
    CoarsenessHint, GestureResponse, GestureTransform, PixelPoint, PointerAction, PointerEvent,
};
pub use julia::Julia;
pub use mandelbrot::Mandelbrot;
pub use settings::ViewSettings;
pub use viewport::{Bounds, SurfaceSize, ViewportState};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
