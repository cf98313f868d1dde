mod common;

use common::{CANVAS, DASH_BOTTOM_Y, DASH_TOP_Y, DASH_X, THIN_Y};
use omralign::geom::transform::scale_translate;
use omralign::{warp_gray, AlignConfig, Aligner, Border, Template};

fn aligner() -> Aligner {
    let cfg = AlignConfig::default();
    let template = Template::from_image(&common::synthetic_template(), &cfg).unwrap();
    Aligner::with_config(template, cfg)
}

#[test]
fn template_fiducials_match_layout() {
    let aligner = aligner();
    let f = aligner.template().fiducials();
    assert!((f.dash_top.x - DASH_X).abs() < 3.0, "x {}", f.dash_top.x);
    assert!((f.dash_top.y - DASH_TOP_Y).abs() < 2.0);
    assert!((f.dash_bottom.y - DASH_BOTTOM_Y).abs() < 2.0);
    assert!((f.thin_right.y - THIN_Y).abs() < 3.0);
    assert_eq!(f.thin_right.x, f64::from(CANVAS) - 10.0);
    assert!(f.header_right.x - f.header_left.x > 900.0);
    assert!(aligner.template().dash_patch().is_some());
}

#[test]
fn page_fiducials_track_known_motion() {
    let aligner = aligner();
    let (sx, sy, tx, ty) = (0.95, 0.95, 8.0, -12.0);
    let motion = scale_translate(sx, sy, tx, ty);
    let page = warp_gray(
        &common::synthetic_template(),
        &motion,
        CANVAS,
        CANVAS,
        Border::White,
    );

    let alignment = aligner.align(&page);
    let f = &alignment.fiducials;
    assert_eq!(alignment.angle_deg, 0.0);
    assert!(f.header_left.x <= f.header_right.x);
    assert!(f.dash_top.y <= f.dash_bottom.y);
    assert!((f.dash_top.x - (sx * DASH_X + tx)).abs() < 3.0, "x {}", f.dash_top.x);
    assert!((f.dash_top.y - (sy * DASH_TOP_Y + ty)).abs() < 3.0, "y {}", f.dash_top.y);
    assert!((f.dash_bottom.y - (sy * DASH_BOTTOM_Y + ty)).abs() < 3.0);
    assert!((f.thin_right.y - (sy * THIN_Y + ty)).abs() < 3.0);
}

#[test]
fn blank_page_still_yields_ordered_fiducials() {
    let aligner = aligner();
    let blank = image::GrayImage::from_pixel(CANVAS, CANVAS, image::Luma([255]));
    let alignment = aligner.align(&blank);
    let f = &alignment.fiducials;
    assert!(f.header_left.x < f.header_right.x);
    assert!(f.dash_top.y < f.dash_bottom.y);
    // The warp still produces a full canvas even from nothing.
    let out = alignment.warp_gray(&blank);
    assert_eq!(out.dimensions(), (CANVAS, CANVAS));
}
