//! Error types for segcurve.

use thiserror::Error;

/// Result alias for segcurve operations.
pub type SegCurveResult<T> = std::result::Result<T, SegCurveError>;

/// Errors that can occur when constructing segcurve inputs.
///
/// Numeric edge cases inside the energy and refinement paths (degenerate
/// segments, points outside the field) are clamped or skipped, never
/// reported as errors; only precondition violations at construction time
/// surface here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegCurveError {
    /// The data-term grid has a zero dimension.
    #[error("invalid field dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The sample buffer does not match the stated dimensions.
    #[error("field buffer holds {got} samples, dimensions require {needed}")]
    BufferSizeMismatch { needed: usize, got: usize },
    /// A closed curve needs at least three vertices.
    #[error("polygon has {got} vertices, at least 3 required")]
    PolygonTooSmall { got: usize },
    /// Image encoding or I/O failed.
    #[cfg(feature = "image-io")]
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
}
