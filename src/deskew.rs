//! Rotation estimation and correction from the header line.
//!
//! The header band at the top of the sheet carries the longest straight rule
//! on the page, so its fitted slope gives the page rotation directly. The
//! correction is the negated line angle, applied about the image center with
//! replicated borders so no white wedges leak into the detection bands.

use image::GrayImage;

use crate::detect::lines::dominant_horizontal_line;
use crate::geom::transform::rotation_about;
use crate::image::horizontal_band;
use crate::pipeline::AlignConfig;
use crate::trace::{trace_event, trace_span};
use crate::warp::{warp_gray, Border};

/// Fraction of the band width a deskew line must span.
const DESKEW_MIN_LEN_FRAC: f64 = 0.15;

/// Estimates and removes the page rotation.
///
/// Returns the corrected image and the applied correction angle in degrees.
/// When no usable line is found, or the measured angle falls below the
/// configured minimum, the input is returned unrotated with angle zero.
pub fn deskew(gray: &GrayImage, cfg: &AlignConfig) -> (GrayImage, f64) {
    let _span = trace_span!("deskew").entered();
    let (width, height) = gray.dimensions();
    let (band, _y0) = horizontal_band(gray, 0.0, cfg.deskew_band_frac);
    let slope_thresh = cfg.max_rotation_deg.to_radians().tan();
    let min_len_px = DESKEW_MIN_LEN_FRAC * f64::from(width);

    let Some(line) = dominant_horizontal_line(&band, slope_thresh, min_len_px) else {
        trace_event!("deskew_skipped", reason = "no line");
        return (gray.clone(), 0.0);
    };

    let line_angle = line
        .m
        .atan()
        .to_degrees()
        .clamp(-cfg.max_rotation_deg, cfg.max_rotation_deg);
    let correction = -line_angle;
    if correction.abs() < cfg.min_rotation_deg {
        trace_event!("deskew_skipped", reason = "below minimum");
        return (gray.clone(), 0.0);
    }

    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    let rotation = rotation_about(cx, cy, correction);
    let corrected = warp_gray(gray, &rotation, width, height, Border::Replicate);
    trace_event!("deskew_applied", angle_deg = correction, support = line.support);
    (corrected, correction)
}
