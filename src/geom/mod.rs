//! Geometric value types for fiducial-based alignment.
//!
//! A `FiducialSet` names the five landmarks located on one image: the two
//! header-line endpoints, the right-edge intersection of the thin rule, and
//! the centers of the topmost and bottommost dash markers in the left margin.
//! Construction enforces the ordering invariant by swapping, never by failing.

pub mod transform;

/// A point in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point2 {
    /// X coordinate (column).
    pub x: f64,
    /// Y coordinate (row).
    pub y: f64,
}

impl Point2 {
    /// Creates a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The five landmarks located on one page or template image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiducialSet {
    /// Left endpoint of the header line.
    pub header_left: Point2,
    /// Right endpoint of the header line.
    pub header_right: Point2,
    /// Right-edge intersection of the thin rule below the header.
    pub thin_right: Point2,
    /// Center of the topmost dash marker in the left margin.
    pub dash_top: Point2,
    /// Center of the bottommost dash marker in the left margin.
    pub dash_bottom: Point2,
}

impl FiducialSet {
    /// Builds a set, swapping entries so that `header_left.x <=
    /// header_right.x` and `dash_top.y <= dash_bottom.y`.
    pub fn new(
        header_left: Point2,
        header_right: Point2,
        thin_right: Point2,
        dash_top: Point2,
        dash_bottom: Point2,
    ) -> Self {
        let (header_left, header_right) = if header_left.x <= header_right.x {
            (header_left, header_right)
        } else {
            (header_right, header_left)
        };
        let (dash_top, dash_bottom) = if dash_top.y <= dash_bottom.y {
            (dash_top, dash_bottom)
        } else {
            (dash_bottom, dash_top)
        };
        Self {
            header_left,
            header_right,
            thin_right,
            dash_top,
            dash_bottom,
        }
    }

    /// Length of the detected header line.
    pub fn header_length(&self) -> f64 {
        self.header_left.distance(self.header_right)
    }

    /// Vertical span between the top and bottom dash centers.
    pub fn dash_span(&self) -> f64 {
        (self.dash_bottom.y - self.dash_top.y).abs()
    }
}

/// Template fiducials divided by the template dimensions.
///
/// These normalized positions anchor the banded searches on each page, so a
/// page scanned at a different resolution is searched in the right place.
#[derive(Clone, Copy, Debug)]
pub struct NormalizedFiducials {
    pub header_left: Point2,
    pub header_right: Point2,
    pub thin_right: Point2,
    pub dash_top: Point2,
    pub dash_bottom: Point2,
}

impl NormalizedFiducials {
    /// Normalizes a fiducial set by the dimensions of the image it was
    /// detected on.
    pub fn from_set(set: &FiducialSet, width: u32, height: u32) -> Self {
        let w = f64::from(width.max(1));
        let h = f64::from(height.max(1));
        let norm = |p: Point2| Point2::new(p.x / w, p.y / h);
        Self {
            header_left: norm(set.header_left),
            header_right: norm(set.header_right),
            thin_right: norm(set.thin_right),
            dash_top: norm(set.dash_top),
            dash_bottom: norm(set.dash_bottom),
        }
    }
}
