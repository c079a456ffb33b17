use thiserror::Error;

/// Errors originating from viewport and settings handling.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid extent: {0} (must be positive and finite)")]
    InvalidExtent(f64),
}
