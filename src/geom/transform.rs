//! Transform models and exact 3x3 solvers.
//!
//! All mappings are expressed as homogeneous `Matrix3<f64>` transforms from
//! page coordinates to template coordinates. The affine and homography
//! solvers are exact (minimal-correspondence) fits; degenerate configurations
//! yield `None` and are handled by the fitter's fallback cascade.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::geom::Point2;

/// Which transform model produced a page mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformModel {
    /// 8-DOF projective mapping from four correspondences.
    Homography,
    /// 6-DOF affine mapping from three correspondences.
    Affine,
    /// Uniform scale plus translation, no rotation re-estimated.
    Similarity,
    /// Independent per-axis scale plus median translation, no shear.
    AxisFit,
}

impl TransformModel {
    /// Stable label used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            TransformModel::Homography => "homography",
            TransformModel::Affine => "affine",
            TransformModel::Similarity => "similarity",
            TransformModel::AxisFit => "axis-fit",
        }
    }
}

/// Maps a point through a 3x3 transform with projective division.
pub fn project(m: &Matrix3<f64>, p: Point2) -> Point2 {
    let v = m * Vector3::new(p.x, p.y, 1.0);
    if v[2].abs() < 1e-12 {
        return Point2::new(f64::NAN, f64::NAN);
    }
    Point2::new(v[0] / v[2], v[1] / v[2])
}

/// Rigid rotation by `angle_deg` about `(cx, cy)`, y-axis pointing down.
pub fn rotation_about(cx: f64, cy: f64, angle_deg: f64) -> Matrix3<f64> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Matrix3::new(
        c,
        -s,
        cx - c * cx + s * cy,
        s,
        c,
        cy - s * cx - c * cy,
        0.0,
        0.0,
        1.0,
    )
}

/// Diagonal scale plus translation.
pub fn scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Matrix3<f64> {
    Matrix3::new(sx, 0.0, tx, 0.0, sy, ty, 0.0, 0.0, 1.0)
}

/// Exact affine transform through three correspondences.
///
/// Returns `None` when the source triple is collinear.
pub fn affine_from_three(src: &[Point2; 3], dst: &[Point2; 3]) -> Option<Matrix3<f64>> {
    let a = Matrix3::new(
        src[0].x, src[0].y, 1.0, //
        src[1].x, src[1].y, 1.0, //
        src[2].x, src[2].y, 1.0,
    );
    let inv = a.try_inverse()?;
    let row_x = inv * Vector3::new(dst[0].x, dst[1].x, dst[2].x);
    let row_y = inv * Vector3::new(dst[0].y, dst[1].y, dst[2].y);
    let m = Matrix3::new(
        row_x[0], row_x[1], row_x[2], //
        row_y[0], row_y[1], row_y[2], //
        0.0, 0.0, 1.0,
    );
    if m.iter().all(|v| v.is_finite()) {
        Some(m)
    } else {
        None
    }
}

/// Exact homography through four correspondences (8-DOF solve).
///
/// Returns `None` for degenerate configurations, e.g. when three of the
/// source points are collinear.
pub fn homography_from_four(src: &[Point2; 4], dst: &[Point2; 4]) -> Option<Matrix3<f64>> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for i in 0..4 {
        let (x, y) = (src[i].x, src[i].y);
        let (u, v) = (dst[i].x, dst[i].y);
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -x * u;
        a[(r, 7)] = -y * u;
        b[r] = u;
        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -x * v;
        a[(r + 1, 7)] = -y * v;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b)?;
    let m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    if !m.iter().all(|v| v.is_finite()) {
        return None;
    }
    // A rank-deficient system (three collinear points) can survive the LU
    // solve as a garbage solution; a true homography interpolates its own
    // correspondences, so verify that before accepting.
    for (s, d) in src.iter().zip(dst.iter()) {
        let p = project(&m, *s);
        if !p.x.is_finite() || !p.y.is_finite() || p.distance(*d) > 1e-3 {
            return None;
        }
    }
    Some(m)
}
