pub mod palettes;
pub mod render;
pub mod replay;
