//! Header-line and thin-rule localization.

use image::GrayImage;

use crate::geom::Point2;
use crate::image::{darkest_row, horizontal_band};

use super::lines::dominant_horizontal_line;

/// Inset from the image edges applied to line endpoints.
pub(crate) const EDGE_INSET: f64 = 10.0;

/// Locates the header line inside a height-fraction band and returns its
/// `(left, right)` endpoints in full-image coordinates.
///
/// When no line passes the slope and length gates, the darkest band row
/// stands in for the line and the endpoints span the inset width.
pub(crate) fn detect_header_line(
    gray: &GrayImage,
    y0_frac: f64,
    y1_frac: f64,
    slope_thresh: f64,
    min_len_frac: f64,
) -> (Point2, Point2) {
    let width = f64::from(gray.width());
    let (band, y0) = horizontal_band(gray, y0_frac, y1_frac);
    let min_len_px = min_len_frac * width;

    if let Some(line) = dominant_horizontal_line(&band, slope_thresh, min_len_px) {
        let x_left = line.x_min.max(EDGE_INSET);
        let x_right = line.x_max.min(width - EDGE_INSET);
        let offset = f64::from(y0);
        return (
            Point2::new(x_left, line.y_at(x_left) + offset),
            Point2::new(x_right, line.y_at(x_right) + offset),
        );
    }

    let y = f64::from(y0 + darkest_row(&band));
    (
        Point2::new(EDGE_INSET, y),
        Point2::new(width - EDGE_INSET, y),
    )
}

/// Locates a horizontal rule inside a band and returns its intersection with
/// the right inset edge.
pub(crate) fn detect_line_right(
    gray: &GrayImage,
    y0_frac: f64,
    y1_frac: f64,
    slope_thresh: f64,
    min_len_frac: f64,
) -> Point2 {
    let width = f64::from(gray.width());
    let (band, y0) = horizontal_band(gray, y0_frac, y1_frac);
    let min_len_px = min_len_frac * width;
    let x_right = width - EDGE_INSET;

    if let Some(line) = dominant_horizontal_line(&band, slope_thresh, min_len_px) {
        return Point2::new(x_right, line.y_at(x_right) + f64::from(y0));
    }
    Point2::new(x_right, f64::from(y0 + darkest_row(&band)))
}

#[cfg(test)]
mod tests {
    use super::{detect_header_line, detect_line_right};
    use image::GrayImage;

    fn page_with_rules() -> GrayImage {
        let mut img = GrayImage::from_pixel(600, 800, image::Luma([255]));
        for x in 10..590u32 {
            for y in 60..66u32 {
                img.put_pixel(x, y, image::Luma([0]));
            }
            for y in 160..162u32 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        img
    }

    #[test]
    fn header_endpoints_land_on_drawn_rule() {
        let img = page_with_rules();
        let (left, right) = detect_header_line(&img, 0.02, 0.15, 0.08, 0.5);
        assert!(left.x < right.x);
        assert!((left.y - 62.5).abs() < 4.0, "left.y = {}", left.y);
        assert!((right.y - 62.5).abs() < 4.0, "right.y = {}", right.y);
        assert!(right.x - left.x > 500.0);
    }

    #[test]
    fn thin_rule_right_intersection() {
        let img = page_with_rules();
        let p = detect_line_right(&img, 0.15, 0.30, 0.08, 0.5);
        assert_eq!(p.x, 590.0);
        assert!((p.y - 161.0).abs() < 3.0, "p.y = {}", p.y);
    }

    #[test]
    fn blank_band_falls_back_to_darkest_row() {
        let img = GrayImage::from_pixel(600, 800, image::Luma([255]));
        let (left, right) = detect_header_line(&img, 0.02, 0.15, 0.08, 0.5);
        assert_eq!(left.x, 10.0);
        assert_eq!(right.x, 590.0);
        assert_eq!(left.y, right.y);
    }
}
