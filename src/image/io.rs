//! Convenience helpers for loading images via the `image` crate.

use image::{GrayImage, RgbImage};
use std::path::Path;

use crate::util::{AlignError, AlignResult};

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray<P: AsRef<Path>>(path: P) -> AlignResult<GrayImage> {
    let img = image::open(path).map_err(|err| AlignError::ImageIo {
        reason: err.to_string(),
    })?;
    Ok(img.to_luma8())
}

/// Loads an image from disk and converts it to RGB.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> AlignResult<RgbImage> {
    let img = image::open(path).map_err(|err| AlignError::ImageIo {
        reason: err.to_string(),
    })?;
    Ok(img.to_rgb8())
}
