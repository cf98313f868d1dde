//! Hough-seeded horizontal line fitting.
//!
//! The Hough transform quantizes angles to whole degrees, which is too coarse
//! for deskew. Each polar candidate is therefore re-fit by least squares over
//! the edge pixels that support it, and near-identical candidates are merged
//! into clusters before picking a winner by support size.

use std::collections::HashSet;

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{detect_lines, LineDetectionOptions};

use crate::util::math::fit_line_lsq;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Slope tolerance when merging candidates into a cluster.
const CLUSTER_SLOPE_TOL: f64 = 0.03;
/// Intercept tolerance when merging candidates into a cluster.
const CLUSTER_INTERCEPT_TOL: f64 = 15.0;

/// A least-squares line `y = m*x + b` with its supporting extent.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FittedLine {
    pub m: f64,
    pub b: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub support: usize,
}

impl FittedLine {
    pub(crate) fn y_at(&self, x: f64) -> f64 {
        self.m * x + self.b
    }
}

struct Candidate {
    m: f64,
    b: f64,
    points: Vec<(u32, u32)>,
}

/// Finds the strongest near-horizontal line in `band`.
///
/// `slope_thresh` bounds the accepted |dy/dx| and `min_len_px` the horizontal
/// extent of the supporting edge pixels. Returns `None` when no candidate
/// passes both gates.
pub(crate) fn dominant_horizontal_line(
    band: &GrayImage,
    slope_thresh: f64,
    min_len_px: f64,
) -> Option<FittedLine> {
    let blurred = gaussian_blur_f32(band, 1.0);
    let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);

    let mut edge_pixels = Vec::new();
    for (x, y, p) in edges.enumerate_pixels() {
        if p[0] > 0 {
            edge_pixels.push((x, y));
        }
    }
    if edge_pixels.is_empty() {
        return None;
    }

    let options = LineDetectionOptions {
        vote_threshold: ((min_len_px / 8.0) as u32).max(20),
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);

    // Slack of one degree covers the accumulator's angle quantization.
    let slope_limit = slope_thresh + 1.0_f64.to_radians().tan();
    let mut candidates: Vec<Candidate> = Vec::new();
    for line in lines {
        let theta = f64::from(line.angle_in_degrees).to_radians();
        let direction = f64::from(line.angle_in_degrees) - 90.0;
        if direction.to_radians().tan().abs() > slope_limit {
            continue;
        }
        let (sin_t, cos_t) = theta.sin_cos();
        let r = f64::from(line.r);
        // Quantization lets true-line pixels drift a few units in r.
        let points: Vec<(u32, u32)> = edge_pixels
            .iter()
            .copied()
            .filter(|&(x, y)| (f64::from(x) * cos_t + f64::from(y) * sin_t - r).abs() <= 3.0)
            .collect();
        let samples: Vec<(f64, f64)> = points
            .iter()
            .map(|&(x, y)| (f64::from(x), f64::from(y)))
            .collect();
        let Some((m, b)) = fit_line_lsq(&samples) else {
            continue;
        };
        if m.abs() > slope_limit {
            continue;
        }
        candidates.push(Candidate { m, b, points });
    }
    if candidates.is_empty() {
        return None;
    }

    // Greedy clustering: the strongest candidate seeds a cluster, weaker
    // near-duplicates fold their support into it.
    candidates.sort_by(|a, b| b.points.len().cmp(&a.points.len()));
    let mut clusters: Vec<Candidate> = Vec::new();
    for cand in candidates {
        let mut merged = false;
        for cluster in clusters.iter_mut() {
            if (cand.m - cluster.m).abs() < CLUSTER_SLOPE_TOL
                && (cand.b - cluster.b).abs() < CLUSTER_INTERCEPT_TOL
            {
                cluster.points.extend_from_slice(&cand.points);
                merged = true;
                break;
            }
        }
        if !merged {
            clusters.push(cand);
        }
    }
    for cluster in clusters.iter_mut() {
        let unique: HashSet<(u32, u32)> = cluster.points.iter().copied().collect();
        cluster.points = unique.into_iter().collect();
    }
    // Rank by horizontal extent, not raw pixel count: a hairline rule puts
    // both of its close edge rows into one cluster and would outvote a
    // longer line. The longest line is the reference, whatever its weight.
    let best = clusters.into_iter().max_by_key(|c| {
        let xs = c.points.iter().map(|&(x, _)| x);
        let extent = xs.clone().max().unwrap_or(0) - xs.min().unwrap_or(0);
        (extent, c.points.len())
    })?;

    // First fit over the cluster's pixels, then a re-gather pass over all
    // edge pixels close to that fit recovers the full line extent.
    let samples: Vec<(f64, f64)> = best
        .points
        .iter()
        .map(|&(x, y)| (f64::from(x), f64::from(y)))
        .collect();
    let (m0, b0) = fit_line_lsq(&samples)?;
    let inliers: Vec<(f64, f64)> = edge_pixels
        .iter()
        .map(|&(x, y)| (f64::from(x), f64::from(y)))
        .filter(|&(x, y)| (y - (m0 * x + b0)).abs() <= 2.5)
        .collect();
    let (m, b) = fit_line_lsq(&inliers)?;
    if m.abs() > slope_limit {
        return None;
    }

    let x_min = inliers.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = inliers.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if x_max - x_min < min_len_px {
        return None;
    }
    Some(FittedLine {
        m,
        b,
        x_min,
        x_max,
        support: inliers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::dominant_horizontal_line;
    use image::GrayImage;

    fn band_with_line(slope: f64, intercept: f64) -> GrayImage {
        let mut img = GrayImage::from_pixel(400, 120, image::Luma([255]));
        for x in 0..400u32 {
            let yc = slope * f64::from(x) + intercept;
            for dy in 0..4 {
                let y = yc as i64 + dy;
                if (0..120).contains(&y) {
                    img.put_pixel(x, y as u32, image::Luma([0]));
                }
            }
        }
        img
    }

    #[test]
    fn recovers_slope_below_hough_quantization() {
        // 0.3 degrees of slope, invisible to a 1-degree accumulator.
        let slope = 0.3_f64.to_radians().tan();
        let band = band_with_line(slope, 40.0);
        let line = dominant_horizontal_line(&band, 0.08, 200.0).expect("line found");
        assert!((line.m - slope).abs() < 0.002, "m = {}", line.m);
        assert!(line.x_max - line.x_min > 300.0);
    }

    #[test]
    fn rejects_steep_lines() {
        let band = band_with_line(0.5, 10.0);
        assert!(dominant_horizontal_line(&band, 0.08, 200.0).is_none());
    }

    #[test]
    fn blank_band_yields_none() {
        let band = GrayImage::from_pixel(400, 120, image::Luma([255]));
        assert!(dominant_horizontal_line(&band, 0.08, 200.0).is_none());
    }
}
