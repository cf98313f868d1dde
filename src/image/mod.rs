//! Grayscale raster helpers shared by the detection stages.
//!
//! Detection works on rectangular sub-regions of a page: horizontal bands for
//! the header and thin rule, a vertical strip for the dash column. ROIs are
//! validated once here; the detectors receive owned crops plus the offset
//! needed to map local coordinates back to the full image.

use image::GrayImage;
use imageproc::contrast::otsu_level;

use crate::util::{AlignError, AlignResult};

pub mod io;

/// Rectangular region in pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Copies a validated sub-region out of `img`.
pub fn crop(img: &GrayImage, roi: Roi) -> AlignResult<GrayImage> {
    let (img_width, img_height) = img.dimensions();
    if roi.width == 0 || roi.height == 0 {
        return Err(AlignError::InvalidDimensions {
            width: roi.width,
            height: roi.height,
        });
    }
    let fits_x = roi.x.checked_add(roi.width).is_some_and(|end| end <= img_width);
    let fits_y = roi.y.checked_add(roi.height).is_some_and(|end| end <= img_height);
    if !fits_x || !fits_y {
        return Err(AlignError::RoiOutOfBounds {
            x: roi.x,
            y: roi.y,
            width: roi.width,
            height: roi.height,
            img_width,
            img_height,
        });
    }
    Ok(image::imageops::crop_imm(img, roi.x, roi.y, roi.width, roi.height).to_image())
}

/// Cuts a horizontal band spanning the full width between two height
/// fractions. Returns the band and its top row in image coordinates.
///
/// Fractions are clamped so the band always has at least one row.
pub(crate) fn horizontal_band(img: &GrayImage, y0_frac: f64, y1_frac: f64) -> (GrayImage, u32) {
    let (width, height) = img.dimensions();
    let h = f64::from(height);
    let y0 = ((y0_frac.max(0.0) * h) as u32).min(height.saturating_sub(1));
    let y1 = ((y1_frac.min(1.0) * h) as u32).clamp(y0 + 1, height);
    let roi = Roi {
        x: 0,
        y: y0,
        width,
        height: y1 - y0,
    };
    // ROI is clamped into bounds above, so crop cannot fail.
    let band = crop(img, roi).unwrap_or_else(|_| img.clone());
    (band, y0)
}

/// Cuts a vertical strip spanning a height window between width fractions.
/// Returns the strip and its `(x0, y0)` origin in image coordinates.
pub(crate) fn window_strip(
    img: &GrayImage,
    x0_frac: f64,
    x1_frac: f64,
    y0_frac: f64,
    y1_frac: f64,
) -> (GrayImage, u32, u32) {
    let (width, height) = img.dimensions();
    let w = f64::from(width);
    let h = f64::from(height);
    let x0 = ((x0_frac.max(0.0) * w) as u32).min(width.saturating_sub(1));
    let x1 = ((x1_frac.min(1.0) * w) as u32).clamp(x0 + 1, width);
    let y0 = ((y0_frac.max(0.0) * h) as u32).min(height.saturating_sub(1));
    let y1 = ((y1_frac.min(1.0) * h) as u32).clamp(y0 + 1, height);
    let roi = Roi {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    };
    let strip = crop(img, roi).unwrap_or_else(|_| img.clone());
    (strip, x0, y0)
}

/// Row index with the darkest mean intensity.
///
/// Used as the header-position proxy when line detection finds nothing.
pub(crate) fn darkest_row(img: &GrayImage) -> u32 {
    let (width, height) = img.dimensions();
    let mut best_row = 0u32;
    let mut best_sum = u64::MAX;
    for y in 0..height {
        let mut sum = 0u64;
        for x in 0..width {
            sum += u64::from(img.get_pixel(x, y)[0]);
        }
        if sum < best_sum {
            best_sum = sum;
            best_row = y;
        }
    }
    best_row
}

/// Otsu-thresholded binarization with dark foreground mapped to 255.
pub(crate) fn binarize_inverted(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] <= level {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    })
}
