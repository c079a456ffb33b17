pub mod buffer;
pub mod engine;
pub mod error;
pub mod export;
pub mod palette;
pub mod region;
pub mod scheduler;
pub mod view;

pub use buffer::{Framebuffer, Generation};
pub use engine::{Block, BlockOutcome, ComputeEngine, CpuEngine, EngineParams, Slot};
pub use error::RenderError;
pub use export::{export_png, ExportMetadata};
pub use palette::{Palette, PaletteTable, Rgb};
pub use region::{split_regions, Region};
pub use scheduler::{
    CoarsenessControl, CoarsenessSweep, RenderCancel, RenderScheduler, ViewEvent, JOIN_TIMEOUT,
    START_COARSENESS,
};
pub use view::FractalView;

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
