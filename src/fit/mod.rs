//! Transform fitting from fiducial correspondences.
//!
//! The cascade tries the richest model first and falls back on degeneracy or
//! implausibility: homography from four correspondences, affine from three,
//! then a similarity from the dash span alone. The similarity never fails,
//! so fitting always yields a usable transform. An independent axis-fit
//! strategy estimates per-axis scale with median translation for sheets
//! whose thin rule is unreliable.

use nalgebra::Matrix3;

use crate::geom::transform::{
    affine_from_three, homography_from_four, project, scale_translate, TransformModel,
};
use crate::geom::{FiducialSet, Point2};
use crate::pipeline::{AlignConfig, FitStrategy};
use crate::trace::trace_event;
use crate::util::math::{clamp_f64, median};

/// A fitted page-to-template mapping with its reporting parameters.
///
/// `sx`, `sy`, `tx`, `ty` are taken from the matrix entries for the linear
/// models; for a homography they describe the affine part only.
#[derive(Clone, Copy, Debug)]
pub struct PageTransform {
    pub matrix: Matrix3<f64>,
    pub model: TransformModel,
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl PageTransform {
    fn from_matrix(matrix: Matrix3<f64>, model: TransformModel) -> Self {
        Self {
            matrix,
            model,
            sx: matrix[(0, 0)],
            sy: matrix[(1, 1)],
            tx: matrix[(0, 2)],
            ty: matrix[(1, 2)],
        }
    }
}

/// Fits the page-to-template transform from two fiducial sets.
///
/// `page_width`/`page_height` are the dimensions of the (deskewed) page the
/// fiducials were detected on; `canvas_width`/`canvas_height` those of the
/// template canvas the page will be warped to.
pub fn fit_transform(
    page: &FiducialSet,
    template: &FiducialSet,
    page_width: u32,
    page_height: u32,
    canvas_width: u32,
    canvas_height: u32,
    cfg: &AlignConfig,
) -> PageTransform {
    let fitted = match cfg.strategy {
        FitStrategy::Cascade => {
            cascade(page, template, page_width, page_height, canvas_width, canvas_height, cfg)
        }
        FitStrategy::AxisFit => axis_fit(page, template, cfg),
    };
    trace_event!(
        "transform_fitted",
        model = fitted.model.as_str(),
        sx = fitted.sx,
        sy = fitted.sy,
        tx = fitted.tx,
        ty = fitted.ty,
    );
    fitted
}

fn cascade(
    page: &FiducialSet,
    template: &FiducialSet,
    page_width: u32,
    page_height: u32,
    canvas_width: u32,
    canvas_height: u32,
    cfg: &AlignConfig,
) -> PageTransform {
    if cfg.allow_homography {
        let src = [
            page.dash_top,
            page.dash_bottom,
            page.header_right,
            page.thin_right,
        ];
        let dst = [
            template.dash_top,
            template.dash_bottom,
            template.header_right,
            template.thin_right,
        ];
        if let Some(h) = homography_from_four(&src, &dst) {
            if plausible(&h, page_width, page_height, cfg.side_balance_max)
                && content_preserved(
                    &h,
                    page_width,
                    page_height,
                    canvas_width,
                    canvas_height,
                    cfg.min_content_frac,
                )
            {
                return PageTransform::from_matrix(h, TransformModel::Homography);
            }
        }
    }

    let src = [page.dash_top, page.dash_bottom, page.header_right];
    let dst = [
        template.dash_top,
        template.dash_bottom,
        template.header_right,
    ];
    if let Some(m) = affine_from_three(&src, &dst) {
        if content_preserved(
            &m,
            page_width,
            page_height,
            canvas_width,
            canvas_height,
            cfg.min_content_frac,
        ) {
            return PageTransform::from_matrix(m, TransformModel::Affine);
        }
    }

    similarity_from_dashes(page, template)
}

/// Uniform scale from the dash span ratio, anchored at the top dash.
///
/// Cannot fail: a degenerate page span falls back to unit scale.
fn similarity_from_dashes(page: &FiducialSet, template: &FiducialSet) -> PageTransform {
    let page_span = page.dash_span();
    let scale = if page_span > 1e-6 {
        template.dash_span() / page_span
    } else {
        1.0
    };
    let tx = template.dash_top.x - scale * page.dash_top.x;
    let ty = template.dash_top.y - scale * page.dash_top.y;
    PageTransform::from_matrix(
        scale_translate(scale, scale, tx, ty),
        TransformModel::Similarity,
    )
}

/// Per-axis scale with median translation.
///
/// The horizontal scale comes from the header length ratio, the vertical
/// scale from the dash span ratio, both clamped to the configured ranges.
/// Translation is the per-axis median of the residuals over the header
/// endpoints and dash centers, so one badly detected fiducial cannot drag
/// the sheet off its anchors.
fn axis_fit(page: &FiducialSet, template: &FiducialSet, cfg: &AlignConfig) -> PageTransform {
    let page_header = page.header_length();
    let page_span = page.dash_span();
    let sx = if page_header > 1e-6 {
        clamp_f64(
            template.header_length() / page_header,
            cfg.sx_clamp.0,
            cfg.sx_clamp.1,
        )
    } else {
        1.0
    };
    let sy = if page_span > 1e-6 {
        clamp_f64(template.dash_span() / page_span, cfg.sy_clamp.0, cfg.sy_clamp.1)
    } else {
        1.0
    };

    let pairs = [
        (page.header_left, template.header_left),
        (page.header_right, template.header_right),
        (page.dash_top, template.dash_top),
        (page.dash_bottom, template.dash_bottom),
    ];
    let tx_residuals: Vec<f64> = pairs.iter().map(|(p, t)| t.x - sx * p.x).collect();
    let ty_residuals: Vec<f64> = pairs.iter().map(|(p, t)| t.y - sy * p.y).collect();
    let tx = median(&tx_residuals).unwrap_or(0.0);
    let ty = median(&ty_residuals).unwrap_or(0.0);

    PageTransform::from_matrix(scale_translate(sx, sy, tx, ty), TransformModel::AxisFit)
}

/// Sanity gate on a fitted homography.
///
/// The mapped page corners must stay finite, keep their orientation (top
/// above bottom, left of right), and keep opposite sides within the balance
/// ratio. A wild perspective from one misdetected fiducial fails here and
/// drops the cascade to affine.
fn plausible(h: &Matrix3<f64>, page_width: u32, page_height: u32, side_balance_max: f64) -> bool {
    let w = f64::from(page_width);
    let ht = f64::from(page_height);
    let tl = project(h, Point2::new(0.0, 0.0));
    let tr = project(h, Point2::new(w, 0.0));
    let br = project(h, Point2::new(w, ht));
    let bl = project(h, Point2::new(0.0, ht));
    let corners = [tl, tr, br, bl];
    if corners.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return false;
    }

    let top_y = (tl.y + tr.y) / 2.0;
    let bottom_y = (bl.y + br.y) / 2.0;
    let left_x = (tl.x + bl.x) / 2.0;
    let right_x = (tr.x + br.x) / 2.0;
    if top_y >= bottom_y || left_x >= right_x {
        return false;
    }

    let balance = |a: f64, b: f64| {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        lo > 1e-6 && hi / lo <= side_balance_max
    };
    let left_len = tl.distance(bl);
    let right_len = tr.distance(br);
    let top_len = tl.distance(tr);
    let bottom_len = bl.distance(br);
    balance(left_len, right_len) && balance(top_len, bottom_len)
}

/// Rejects transforms that collapse the page to a sliver of the canvas.
///
/// The bounding box of the mapped page corners, intersected with the canvas,
/// must keep at least `min_frac` of the shorter canvas dimension.
fn content_preserved(
    m: &Matrix3<f64>,
    page_width: u32,
    page_height: u32,
    canvas_width: u32,
    canvas_height: u32,
    min_frac: f64,
) -> bool {
    let w = f64::from(page_width);
    let h = f64::from(page_height);
    let corners = [
        project(m, Point2::new(0.0, 0.0)),
        project(m, Point2::new(w, 0.0)),
        project(m, Point2::new(w, h)),
        project(m, Point2::new(0.0, h)),
    ];
    if corners.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return false;
    }
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let visible_w = max_x.min(f64::from(canvas_width)) - min_x.max(0.0);
    let visible_h = max_y.min(f64::from(canvas_height)) - min_y.max(0.0);
    let needed = min_frac * f64::from(canvas_width.min(canvas_height));
    visible_w >= needed && visible_h >= needed
}
