use heatmark_spatial::SpatialError;
use thiserror::Error;

/// Errors that can occur in coverage-store operations.
///
/// Absent keys and duplicate points are not errors; they are signaled with
/// `Option`/`bool` sentinels. Only invalid inputs reach this type, and only
/// before any state is mutated. Structural corruption of the underlying
/// trees is a programmer error and panics instead.
#[derive(Debug, Error)]
pub enum HeatmarkError {
    /// Query parameters were degenerate: a non-positive or non-finite
    /// radius, height or width.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A point coordinate was not a finite number.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// The spatial index rejected an operation.
    #[error("spatial index error: {0}")]
    Spatial(#[from] SpatialError),
}

/// Result type for coverage-store operations
pub type HeatmarkResult<T> = Result<T, HeatmarkError>;
