use serde::{Deserialize, Serialize};

use crate::complex::Complex;

/// The result of iterating a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationResult {
    /// The orbit left the bailout circle after `iterations` steps.
    Escaped { iterations: u32 },

    /// The orbit stayed bounded for the whole iteration budget.
    Interior,
}

/// Which of the two fractal families a view shows.
///
/// The explorer runs one view of each kind side by side; the kind also
/// decides which engine slot the view owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalKind {
    Mandelbrot,
    Julia,
}

impl FractalKind {
    pub fn is_julia(self) -> bool {
        self == Self::Julia
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::Julia => "Julia",
        }
    }
}

impl std::fmt::Display for FractalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Escape-time iteration for one fractal family.
///
/// Block renderers are generic over `F: Fractal` so the inner loop is
/// statically dispatched.
pub trait Fractal {
    /// Iterate a single complex-plane point.
    fn iterate(&self, point: Complex) -> IterationResult;

    /// The iteration budget after which a point counts as interior.
    fn max_iterations(&self) -> u32;
}
