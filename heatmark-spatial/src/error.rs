use thiserror::Error;

/// Errors that can occur in spatial index operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The supplied box has non-finite coordinates or inverted corners;
    /// rejected before anything is stored.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;
