//! Fiducial detection: header line, thin rule, and dash column.
//!
//! Searches are banded. On the template the bands sit at fixed layout
//! fractions; on pages they are anchored around the template's normalized
//! fiducial positions so resolution and moderate drift do not matter.

use image::GrayImage;

use crate::geom::{FiducialSet, NormalizedFiducials, Point2};
use crate::image::window_strip;
use crate::pipeline::AlignConfig;
use crate::template::DashPatch;

pub(crate) mod dash;
pub(crate) mod header;
pub(crate) mod lines;

use dash::{detect_dashes_components, detect_dashes_patch};
use header::{detect_header_line, detect_line_right};

/// Search windows for one image, all as fractions of its dimensions.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FiducialBands {
    pub header_y0: f64,
    pub header_y1: f64,
    pub thin_y0: f64,
    pub thin_y1: f64,
    pub dash_x0: f64,
    pub dash_x1: f64,
    pub dash_y0: f64,
    pub dash_y1: f64,
    pub header_min_len_frac: f64,
    pub thin_min_len_frac: f64,
}

impl FiducialBands {
    /// Fixed layout bands used on the template itself.
    pub(crate) fn template_default() -> Self {
        Self {
            header_y0: 0.02,
            header_y1: 0.22,
            thin_y0: 0.16,
            thin_y1: 0.32,
            dash_x0: 0.03,
            dash_x1: 0.18,
            dash_y0: 0.0,
            dash_y1: 1.0,
            header_min_len_frac: 0.5,
            thin_min_len_frac: 0.55,
        }
    }

    /// Bands centered on the template's normalized fiducials, widened by
    /// `tight` to absorb page drift. Length gates relax since a shrunken
    /// page still has to pass them.
    pub(crate) fn anchored(norm: &NormalizedFiducials, tight: f64) -> Self {
        let header_cy = (norm.header_left.y + norm.header_right.y) / 2.0;
        let header_half = tight.max(0.02);
        let thin_half = tight.max(0.015);
        let dash_cx = (norm.dash_top.x + norm.dash_bottom.x) / 2.0;
        Self {
            header_y0: (header_cy - header_half).max(0.0),
            header_y1: (header_cy + header_half).min(1.0),
            thin_y0: (norm.thin_right.y - thin_half).max(0.0),
            thin_y1: (norm.thin_right.y + thin_half).min(1.0),
            dash_x0: (dash_cx - 0.075).max(0.0),
            dash_x1: (dash_cx + 0.075).min(1.0),
            dash_y0: (norm.dash_top.y - 0.12).clamp(0.0, 0.98),
            dash_y1: (norm.dash_bottom.y + 0.12).clamp(0.02, 1.0),
            header_min_len_frac: 0.4,
            thin_min_len_frac: 0.4,
        }
    }
}

/// Detects all five fiducials on `gray`.
///
/// Never fails: each landmark has a geometric fallback, and the resulting
/// set enforces its own ordering on construction.
pub(crate) fn detect_fiducials(
    gray: &GrayImage,
    bands: &FiducialBands,
    patch: Option<&DashPatch>,
    cfg: &AlignConfig,
) -> FiducialSet {
    let height = f64::from(gray.height());

    let (header_left, mut header_right) = detect_header_line(
        gray,
        bands.header_y0,
        bands.header_y1,
        cfg.slope_thresh,
        bands.header_min_len_frac,
    );
    let mut thin_right = detect_line_right(
        gray,
        bands.thin_y0,
        bands.thin_y1,
        cfg.slope_thresh,
        bands.thin_min_len_frac,
    );
    // Overlapping bands on a badly shifted scan can pick the rules in the
    // wrong order; the thin rule is always the lower of the two.
    if header_right.y > thin_right.y {
        std::mem::swap(&mut header_right, &mut thin_right);
    }

    let (strip, x_off, y_off) = window_strip(
        gray,
        bands.dash_x0,
        bands.dash_x1,
        bands.dash_y0,
        bands.dash_y1,
    );
    let min_sep = (cfg.min_peak_sep_frac * height).max(6.0);
    let offset = |p: Point2| Point2::new(p.x + f64::from(x_off), p.y + f64::from(y_off));
    let strip_cx = f64::from(x_off) + f64::from(strip.width()) / 2.0;

    let (dash_top, dash_bottom) = match patch {
        Some(patch) => detect_dashes_patch(&strip, patch, cfg.match_threshold, min_sep)
            .map(|(t, b)| (offset(t), offset(b)))
            .unwrap_or_else(|| {
                (
                    Point2::new(strip_cx, 0.08 * height),
                    Point2::new(strip_cx, 0.92 * height),
                )
            }),
        None => detect_dashes_components(&strip)
            .map(|(t, b)| (offset(t), offset(b)))
            .unwrap_or_else(|| {
                let strip_h = f64::from(strip.height());
                (
                    Point2::new(strip_cx, f64::from(y_off) + 0.05 * strip_h),
                    Point2::new(strip_cx, f64::from(y_off) + 0.95 * strip_h),
                )
            }),
    };

    FiducialSet::new(header_left, header_right, thin_right, dash_top, dash_bottom)
}

#[cfg(test)]
mod tests {
    use super::{detect_fiducials, FiducialBands};
    use crate::pipeline::AlignConfig;
    use image::GrayImage;

    fn synthetic_page() -> GrayImage {
        let mut img = GrayImage::from_pixel(600, 800, image::Luma([255]));
        for x in 10..590u32 {
            for y in 40..46u32 {
                img.put_pixel(x, y, image::Luma([0]));
            }
            if x >= 40 {
                for y in 160..162u32 {
                    img.put_pixel(x, y, image::Luma([0]));
                }
            }
        }
        for i in 0..12u32 {
            let cy = 70 + i * 60;
            for y in cy - 5..cy + 5 {
                for x in 30..48u32 {
                    img.put_pixel(x, y, image::Luma([0]));
                }
            }
        }
        img
    }

    #[test]
    fn all_fiducials_near_ground_truth() {
        let img = synthetic_page();
        let cfg = AlignConfig::default();
        let set = detect_fiducials(&img, &FiducialBands::template_default(), None, &cfg);

        assert!((set.header_left.y - 42.5).abs() < 4.0);
        assert!((set.header_right.y - 42.5).abs() < 4.0);
        assert!(set.header_right.x - set.header_left.x > 500.0);
        assert_eq!(set.thin_right.x, 590.0);
        assert!((set.thin_right.y - 161.0).abs() < 3.0);
        assert!((set.dash_top.y - 69.5).abs() < 2.0, "top {}", set.dash_top.y);
        assert!(
            (set.dash_bottom.y - 729.5).abs() < 2.0,
            "bottom {}",
            set.dash_bottom.y
        );
        assert!(set.header_left.x <= set.header_right.x);
        assert!(set.dash_top.y <= set.dash_bottom.y);
    }

    #[test]
    fn blank_page_uses_geometric_fallbacks() {
        let img = GrayImage::from_pixel(600, 800, image::Luma([255]));
        let cfg = AlignConfig::default();
        let set = detect_fiducials(&img, &FiducialBands::template_default(), None, &cfg);
        assert!(set.dash_top.y < set.dash_bottom.y);
        assert!(set.header_left.x < set.header_right.x);
    }
}
