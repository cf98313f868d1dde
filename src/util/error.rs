//! Error types for omralign.

use thiserror::Error;

/// Result alias for alignment operations.
pub type AlignResult<T> = std::result::Result<T, AlignError>;

/// Errors that can occur during template and patch setup.
///
/// Per-page detection and fitting never surface errors: every detector stage
/// has a deterministic geometric fallback and the fitter cascade terminates
/// in the always-valid similarity model. Only setup-time conditions are
/// reported through this type.
#[derive(Debug, Error)]
pub enum AlignError {
    /// An image dimension was zero or inconsistent.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// A requested region does not fit inside the image.
    #[error("roi ({x}, {y}) {width}x{height} outside image {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        img_width: u32,
        img_height: u32,
    },
    /// The dash reference patch is unusable as a matching kernel.
    #[error("degenerate dash patch: {reason}")]
    DegeneratePatch { reason: &'static str },
    /// Image decode or encode failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
    /// Reading or writing the patch cache failed.
    #[error("patch cache i/o failed: {reason}")]
    CacheIo { reason: String },
}
