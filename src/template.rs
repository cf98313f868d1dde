//! Reference template: fiducials, normalized anchors, and the dash patch.

use image::GrayImage;

use crate::deskew::deskew;
use crate::detect::dash::component_boxes;
use crate::detect::{detect_fiducials, FiducialBands};
use crate::geom::{FiducialSet, NormalizedFiducials};
use crate::image::{crop, window_strip, Roi};
use crate::pipeline::AlignConfig;
use crate::trace::trace_event;
use crate::util::math::median;
use crate::util::{AlignError, AlignResult};

/// Padding around a selected dash component when cutting the patch.
const PATCH_PAD: u32 = 2;

/// A grayscale exemplar of one dash marker, preprocessed for correlation.
///
/// The zero-mean buffer and template variance are fixed at construction so
/// the per-window scan only has to accumulate image sums.
pub struct DashPatch {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) zero_mean: Vec<f32>,
    pub(crate) var_t: f32,
    image: GrayImage,
}

impl DashPatch {
    /// Builds a patch from a grayscale cutout.
    ///
    /// Fails for cutouts smaller than 3x3 or without any contrast, since
    /// neither can produce a meaningful correlation score.
    pub fn new(image: GrayImage) -> AlignResult<Self> {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            return Err(AlignError::DegeneratePatch {
                reason: "smaller than 3x3",
            });
        }
        let n = (width * height) as f32;
        let sum: f32 = image.pixels().map(|p| f32::from(p[0])).sum();
        let mean = sum / n;
        let zero_mean: Vec<f32> = image.pixels().map(|p| f32::from(p[0]) - mean).collect();
        let var_t: f32 = zero_mean.iter().map(|v| v * v).sum();
        if var_t <= 1e-8 {
            return Err(AlignError::DegeneratePatch {
                reason: "no contrast",
            });
        }
        Ok(Self {
            width,
            height,
            zero_mean,
            var_t,
            image,
        })
    }

    /// The raw patch pixels, e.g. for persisting to a cache.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Patch dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// The reference sheet every page is aligned to.
pub struct Template {
    pub(crate) fiducials: FiducialSet,
    pub(crate) normalized: NormalizedFiducials,
    pub(crate) dash_patch: Option<DashPatch>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Template {
    /// Builds a template from its image: self-deskews, cuts a dash patch
    /// from the margin strip, and detects the five fiducials.
    pub fn from_image(image: &GrayImage, cfg: &AlignConfig) -> AlignResult<Self> {
        Self::build(image, None, cfg)
    }

    /// Like [`Template::from_image`] but with a pre-built dash patch, e.g.
    /// loaded from the patch cache or supplied by the operator.
    pub fn with_patch(
        image: &GrayImage,
        patch: Option<DashPatch>,
        cfg: &AlignConfig,
    ) -> AlignResult<Self> {
        Self::build(image, patch, cfg)
    }

    fn build(image: &GrayImage, patch: Option<DashPatch>, cfg: &AlignConfig) -> AlignResult<Self> {
        let (width, height) = image.dimensions();
        if width < 32 || height < 32 {
            return Err(AlignError::InvalidDimensions { width, height });
        }
        let (deskewed, angle) = deskew(image, cfg);
        if angle != 0.0 {
            trace_event!("template_deskewed", angle_deg = angle);
        }
        let dash_patch = patch.or_else(|| extract_dash_patch(&deskewed));
        let fiducials = detect_fiducials(
            &deskewed,
            &FiducialBands::template_default(),
            dash_patch.as_ref(),
            cfg,
        );
        let normalized = NormalizedFiducials::from_set(&fiducials, width, height);
        Ok(Self {
            fiducials,
            normalized,
            dash_patch,
            width,
            height,
        })
    }

    /// The detected template fiducials, in template pixel coordinates.
    pub fn fiducials(&self) -> &FiducialSet {
        &self.fiducials
    }

    /// Canvas dimensions every aligned page is warped to.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The dash patch, when one could be extracted or was supplied.
    pub fn dash_patch(&self) -> Option<&DashPatch> {
        self.dash_patch.as_ref()
    }
}

/// Cuts a dash exemplar out of the template's margin strip.
///
/// Components in the strip are ranked by closeness to the median dash size,
/// restricted to the central band of vertical positions so partial dashes at
/// the strip edges are never chosen. `None` when the strip holds fewer than
/// three plausible components; detection then falls back to the
/// connected-components strategy.
pub(crate) fn extract_dash_patch(gray: &GrayImage) -> Option<DashPatch> {
    let (strip, _x0, _y0) = window_strip(gray, 0.03, 0.18, 0.0, 1.0);
    let boxes = component_boxes(&strip);
    if boxes.len() < 3 {
        return None;
    }

    let widths: Vec<f64> = boxes.iter().map(|(_, w, _)| *w).collect();
    let heights: Vec<f64> = boxes.iter().map(|(_, _, h)| *h).collect();
    let median_w = median(&widths)?;
    let median_h = median(&heights)?;

    // Central band of vertical positions, 15th to 85th percentile.
    let mut cys: Vec<f64> = boxes.iter().map(|(c, _, _)| c.y).collect();
    cys.sort_by(f64::total_cmp);
    let pct = |frac: f64| cys[((frac * (cys.len() - 1) as f64).round() as usize).min(cys.len() - 1)];
    let (lo, hi) = (pct(0.15), pct(0.85));

    let best = boxes
        .iter()
        .filter(|(c, _, _)| c.y >= lo && c.y <= hi)
        .min_by(|a, b| {
            let da = (a.1 - median_w).abs() + (a.2 - median_h).abs();
            let db = (b.1 - median_w).abs() + (b.2 - median_h).abs();
            da.total_cmp(&db)
        })?;

    let (center, w, h) = best;
    let x = ((center.x - w / 2.0) as i64 - i64::from(PATCH_PAD)).max(0) as u32;
    let y = ((center.y - h / 2.0) as i64 - i64::from(PATCH_PAD)).max(0) as u32;
    let width = (*w as u32 + 2 * PATCH_PAD).min(strip.width() - x);
    let height = (*h as u32 + 2 * PATCH_PAD).min(strip.height() - y);
    let cutout = crop(
        &strip,
        Roi {
            x,
            y,
            width,
            height,
        },
    )
    .ok()?;
    DashPatch::new(cutout).ok()
}
