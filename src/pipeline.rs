//! End-to-end page alignment: deskew, detect, fit, warp.

use image::{GrayImage, RgbImage};
use nalgebra::Matrix3;

use crate::detect::{detect_fiducials, FiducialBands};
use crate::deskew::deskew;
use crate::fit::{fit_transform, PageTransform};
use crate::geom::transform::rotation_about;
use crate::geom::FiducialSet;
use crate::template::Template;
use crate::trace::trace_span;
use crate::warp::{warp_gray, warp_rgb, Border};

/// Which fitting strategy [`Aligner::align`] runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitStrategy {
    /// Homography, then affine, then dash-span similarity.
    Cascade,
    /// Per-axis scale with median translation.
    AxisFit,
}

/// Tuning knobs for the whole pipeline. The defaults match the standard
/// answer-sheet layout and survive scans between 150 and 600 dpi.
#[derive(Clone, Debug)]
pub struct AlignConfig {
    /// Fraction of the page height searched for the deskew line.
    pub deskew_band_frac: f64,
    /// Largest rotation the deskewer will correct, in degrees.
    pub max_rotation_deg: f64,
    /// Rotations below this are treated as already straight.
    pub min_rotation_deg: f64,
    /// Half-width added around the template anchors when banding page
    /// searches, as a fraction of the page dimension.
    pub tight: f64,
    /// Maximum |dy/dx| for the header and thin rule candidates.
    pub slope_thresh: f64,
    /// Correlation score a dash match must reach.
    pub match_threshold: f32,
    /// Minimum vertical separation between dash matches, as a fraction of
    /// the page height.
    pub min_peak_sep_frac: f64,
    /// Whether the cascade may fit a homography at all.
    pub allow_homography: bool,
    /// Fitting strategy.
    pub strategy: FitStrategy,
    /// Accepted horizontal scale range for the axis fit.
    pub sx_clamp: (f64, f64),
    /// Accepted vertical scale range for the axis fit.
    pub sy_clamp: (f64, f64),
    /// Largest ratio between opposite mapped page sides a homography may
    /// produce before it is considered implausible.
    pub side_balance_max: f64,
    /// Smallest fraction of the canvas the mapped page must cover.
    pub min_content_frac: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            deskew_band_frac: 0.25,
            max_rotation_deg: 25.0,
            min_rotation_deg: 0.1,
            tight: 0.05,
            slope_thresh: 0.08,
            match_threshold: 0.55,
            min_peak_sep_frac: 0.04,
            allow_homography: true,
            strategy: FitStrategy::Cascade,
            sx_clamp: (0.8, 1.25),
            sy_clamp: (0.8, 1.25),
            side_balance_max: 2.2,
            min_content_frac: 0.3,
        }
    }
}

/// Alignment result for one page.
///
/// Holds everything needed to warp the page (or a color sibling scanned in
/// the same pass) onto the template canvas, plus the measurements worth
/// reporting: the deskew angle, the detected fiducials, and the fitted
/// transform.
pub struct Alignment {
    /// Deskew correction that was applied, in degrees. Zero when the page
    /// was already straight.
    pub angle_deg: f64,
    /// Fiducials detected on the deskewed page.
    pub fiducials: FiducialSet,
    /// Fitted page-to-template transform.
    pub transform: PageTransform,
    rotation: Option<Matrix3<f64>>,
    canvas_width: u32,
    canvas_height: u32,
}

impl Alignment {
    /// Warps a grayscale page onto the template canvas.
    ///
    /// The page passes through the same deskew rotation the detector saw
    /// (replicated borders), then through the fitted transform with white
    /// fill. Output dimensions always equal the template's.
    pub fn warp_gray(&self, page: &GrayImage) -> GrayImage {
        let deskewed = self.deskewed_gray(page);
        warp_gray(
            &deskewed,
            &self.transform.matrix,
            self.canvas_width,
            self.canvas_height,
            Border::White,
        )
    }

    /// RGB variant of [`Alignment::warp_gray`], for color scans aligned via
    /// their grayscale conversion.
    pub fn warp_rgb(&self, page: &RgbImage) -> RgbImage {
        let deskewed = match &self.rotation {
            Some(r) => warp_rgb(page, r, page.width(), page.height(), Border::Replicate),
            None => page.clone(),
        };
        warp_rgb(
            &deskewed,
            &self.transform.matrix,
            self.canvas_width,
            self.canvas_height,
            Border::White,
        )
    }

    /// The page as the detector saw it: the deskew rotation applied with
    /// replicated borders, dimensions unchanged. [`Alignment::fiducials`]
    /// live in this image's coordinates, which makes it the right backdrop
    /// for detection overlays. Pages that needed no correction pass through
    /// as a plain copy.
    pub fn deskewed_gray(&self, page: &GrayImage) -> GrayImage {
        match &self.rotation {
            Some(r) => warp_gray(page, r, page.width(), page.height(), Border::Replicate),
            None => page.clone(),
        }
    }

    /// Canvas dimensions the warps produce.
    pub fn canvas_dimensions(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }
}

/// Aligns scanned pages to a [`Template`].
pub struct Aligner {
    template: Template,
    config: AlignConfig,
}

impl Aligner {
    /// Creates an aligner with default configuration.
    pub fn new(template: Template) -> Self {
        Self::with_config(template, AlignConfig::default())
    }

    /// Creates an aligner with explicit configuration.
    pub fn with_config(template: Template, config: AlignConfig) -> Self {
        Self { template, config }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Runs the full pipeline on one grayscale page.
    ///
    /// Never fails: every stage degrades to a fallback, down to a dash-span
    /// similarity when richer models are degenerate or implausible.
    pub fn align(&self, page: &GrayImage) -> Alignment {
        let _span = trace_span!("align").entered();

        let (deskewed, angle_deg) = deskew(page, &self.config);
        let rotation = (angle_deg != 0.0).then(|| {
            rotation_about(
                f64::from(page.width()) / 2.0,
                f64::from(page.height()) / 2.0,
                angle_deg,
            )
        });

        let bands = FiducialBands::anchored(&self.template.normalized, self.config.tight);
        let fiducials = detect_fiducials(
            &deskewed,
            &bands,
            self.template.dash_patch.as_ref(),
            &self.config,
        );

        let transform = fit_transform(
            &fiducials,
            &self.template.fiducials,
            deskewed.width(),
            deskewed.height(),
            self.template.width,
            self.template.height,
            &self.config,
        );

        Alignment {
            angle_deg,
            fiducials,
            transform,
            rotation,
            canvas_width: self.template.width,
            canvas_height: self.template.height,
        }
    }
}
