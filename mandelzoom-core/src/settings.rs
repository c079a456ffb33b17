use serde::{Deserialize, Serialize};

use crate::fractal::FractalKind;
use crate::viewport::{
    DEFAULT_CENTER, DEFAULT_EXTENT, DEFAULT_ITERATIONS, DEFAULT_JULIA_CENTER, DEFAULT_JULIA_EXTENT,
};

/// The per-view state that survives a restart.
///
/// Every field has a serde default so that a partial or older file still
/// loads; range checks happen when the settings are applied to a viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default = "default_center_re")]
    pub center_re: f64,
    #[serde(default)]
    pub center_im: f64,
    #[serde(default = "default_extent")]
    pub extent: f64,
    #[serde(default = "default_iterations")]
    pub iterations: i64,
    #[serde(default)]
    pub palette_index: usize,
    #[serde(default)]
    pub julia_seed_re: f64,
    #[serde(default)]
    pub julia_seed_im: f64,
}

fn default_center_re() -> f64 {
    DEFAULT_CENTER.re
}
fn default_extent() -> f64 {
    DEFAULT_EXTENT
}
fn default_iterations() -> i64 {
    DEFAULT_ITERATIONS as i64
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            center_re: default_center_re(),
            center_im: 0.0,
            extent: default_extent(),
            iterations: default_iterations(),
            palette_index: 0,
            julia_seed_re: 0.0,
            julia_seed_im: 0.0,
        }
    }
}

impl ViewSettings {
    /// Settings matching a freshly reset viewport of `kind`.
    pub fn for_kind(kind: FractalKind) -> Self {
        match kind {
            FractalKind::Mandelbrot => Self::default(),
            FractalKind::Julia => Self {
                center_re: DEFAULT_JULIA_CENTER.re,
                center_im: DEFAULT_JULIA_CENTER.im,
                extent: DEFAULT_JULIA_EXTENT,
                ..Self::default()
            },
        }
    }
}
