//! Dash-column detection in the left margin strip.
//!
//! Two strategies share the same output shape: a connected-components pass
//! over the binarized strip, and a normalized cross-correlation scan with a
//! dash patch cut from the template. The scan wins when a patch is available
//! because it tolerates broken or smudged dashes far better.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::geom::Point2;
use crate::image::binarize_inverted;
use crate::template::DashPatch;
use crate::util::math::mean;

const MIN_COMPONENT_AREA: u32 = 30;
const ASPECT_MIN: f64 = 0.4;
const ASPECT_MAX: f64 = 2.5;

struct BoundingBox {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

impl BoundingBox {
    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn center(&self) -> Point2 {
        Point2::new(
            f64::from(self.min_x + self.max_x) / 2.0,
            f64::from(self.min_y + self.max_y) / 2.0,
        )
    }
}

pub(crate) fn component_boxes(strip: &GrayImage) -> Vec<(Point2, f64, f64)> {
    let binary = binarize_inverted(strip);
    let opened = open(&binary, Norm::LInf, 1);
    let labels = connected_components(&opened, Connectivity::Eight, Luma([0u8]));

    let mut boxes: HashMap<u32, BoundingBox> = HashMap::new();
    for (x, y, p) in labels.enumerate_pixels() {
        let label = p[0];
        if label == 0 {
            continue;
        }
        boxes
            .entry(label)
            .and_modify(|b| {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
                b.area += 1;
            })
            .or_insert(BoundingBox {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                area: 1,
            });
    }

    let strip_area = strip.width() * strip.height();
    let min_area = MIN_COMPONENT_AREA.max(strip_area / 1000);
    let mut kept: Vec<(Point2, f64, f64)> = boxes
        .values()
        .filter(|b| {
            let aspect = f64::from(b.width()) / f64::from(b.height());
            b.area >= min_area && (ASPECT_MIN..=ASPECT_MAX).contains(&aspect)
        })
        .map(|b| (b.center(), f64::from(b.width()), f64::from(b.height())))
        .collect();
    kept.sort_by(|a, b| a.0.y.total_cmp(&b.0.y));
    kept
}

/// Connected-components dash detection.
///
/// Returns the top and bottom dash centers in strip-local coordinates, with
/// the x coordinate unified to the column mean. `None` when fewer than two
/// plausible dash components survive the area and aspect filters.
pub(crate) fn detect_dashes_components(strip: &GrayImage) -> Option<(Point2, Point2)> {
    let boxes = component_boxes(strip);
    if boxes.len() < 2 {
        return None;
    }
    let xs: Vec<f64> = boxes.iter().map(|(c, _, _)| c.x).collect();
    let x = mean(&xs)?;
    let top = boxes.first()?.0;
    let bottom = boxes.last()?.0;
    Some((Point2::new(x, top.y), Point2::new(x, bottom.y)))
}

/// One accepted match position from the patch scan.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PatchPeak {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Normalized cross-correlation scan of the dash patch over the strip.
///
/// Peaks below `threshold` are dropped; if nothing passes, one retry at 90%
/// of the threshold runs before giving up. Surviving peaks are suppressed to
/// a minimum vertical separation and capped at 30. As with the components
/// strategy, the x coordinate is unified to the mean over all kept matches;
/// the dashes print in one column, so per-match x jitter is noise.
pub(crate) fn detect_dashes_patch(
    strip: &GrayImage,
    patch: &DashPatch,
    threshold: f32,
    min_sep: f64,
) -> Option<(Point2, Point2)> {
    let peaks = scan_patch(strip, patch, threshold, min_sep);
    if peaks.len() < 2 {
        return None;
    }
    let top = peaks.iter().min_by_key(|p| p.y)?;
    let bottom = peaks.iter().max_by_key(|p| p.y)?;
    if f64::from(bottom.y - top.y) < min_sep {
        return None;
    }
    let half_w = f64::from(patch.width) / 2.0;
    let half_h = f64::from(patch.height) / 2.0;
    let xs: Vec<f64> = peaks.iter().map(|p| f64::from(p.x) + half_w).collect();
    let x = mean(&xs)?;
    Some((
        Point2::new(x, f64::from(top.y) + half_h),
        Point2::new(x, f64::from(bottom.y) + half_h),
    ))
}

fn scan_patch(
    strip: &GrayImage,
    patch: &DashPatch,
    threshold: f32,
    min_sep: f64,
) -> Vec<PatchPeak> {
    let (sw, sh) = strip.dimensions();
    let (pw, ph) = (patch.width, patch.height);
    if sw < pw || sh < ph {
        return Vec::new();
    }
    let n = (pw * ph) as f32;

    let mut scored: Vec<PatchPeak> = Vec::new();
    for y in 0..=(sh - ph) {
        for x in 0..=(sw - pw) {
            let mut dot = 0.0f32;
            let mut sum = 0.0f32;
            let mut sum_sq = 0.0f32;
            let mut i = 0usize;
            for dy in 0..ph {
                for dx in 0..pw {
                    let v = f32::from(strip.get_pixel(x + dx, y + dy)[0]);
                    dot += patch.zero_mean[i] * v;
                    sum += v;
                    sum_sq += v * v;
                    i += 1;
                }
            }
            let var_i = sum_sq - sum * sum / n;
            if var_i <= 1e-8 {
                continue;
            }
            let score = dot / (patch.var_t * var_i).sqrt();
            scored.push(PatchPeak { x, y, score });
        }
    }

    let mut passing: Vec<PatchPeak> = scored
        .iter()
        .copied()
        .filter(|p| p.score >= threshold)
        .collect();
    if passing.is_empty() {
        let relaxed = threshold * 0.9;
        passing = scored
            .iter()
            .copied()
            .filter(|p| p.score >= relaxed)
            .collect();
    }
    passing.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    let mut kept: Vec<PatchPeak> = Vec::new();
    for peak in passing {
        if kept.len() >= 30 {
            break;
        }
        let clear = kept
            .iter()
            .all(|k| (f64::from(peak.y) - f64::from(k.y)).abs() >= min_sep);
        if clear {
            kept.push(peak);
        }
    }
    kept
}
