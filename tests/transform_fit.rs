use nalgebra::Matrix3;
use omralign::geom::transform::project;
use omralign::{
    fit_transform, AlignConfig, FiducialSet, FitStrategy, Point2, TransformModel,
};

const W: u32 = 1000;
const H: u32 = 1000;

fn template_set() -> FiducialSet {
    FiducialSet::new(
        Point2::new(10.0, 51.5),
        Point2::new(990.0, 51.5),
        Point2::new(990.0, 199.5),
        Point2::new(50.5, 79.5),
        Point2::new(50.5, 919.5),
    )
}

fn map_set(set: &FiducialSet, m: &Matrix3<f64>) -> FiducialSet {
    FiducialSet::new(
        project(m, set.header_left),
        project(m, set.header_right),
        project(m, set.thin_right),
        project(m, set.dash_top),
        project(m, set.dash_bottom),
    )
}

#[test]
fn homography_recovers_known_perspective() {
    let template = template_set();
    // Template-to-page motion with a mild perspective component.
    let motion = Matrix3::new(
        0.95, 0.0, 12.0, //
        0.0, 0.93, -8.0, //
        1.0e-5, 5.0e-6, 1.0,
    );
    let page = map_set(&template, &motion);

    let fitted = fit_transform(&page, &template, W, H, W, H, &AlignConfig::default());
    assert_eq!(fitted.model, TransformModel::Homography);

    // Probe interior points the fit never saw.
    for probe in [
        Point2::new(500.0, 500.0),
        Point2::new(200.0, 800.0),
        Point2::new(850.0, 150.0),
    ] {
        let on_page = project(&motion, probe);
        let back = project(&fitted.matrix, on_page);
        assert!(back.distance(probe) <= 2.0, "residual {}", back.distance(probe));
    }
}

#[test]
fn collinear_thin_rule_drops_to_affine() {
    let template = template_set();
    // The page's thin-rule point sits on the dash column, so three of the
    // four homography correspondences are collinear.
    let page = FiducialSet::new(
        Point2::new(10.0, 51.5),
        Point2::new(990.0, 51.5),
        Point2::new(50.5, 199.5),
        Point2::new(50.5, 79.5),
        Point2::new(50.5, 919.5),
    );
    let fitted = fit_transform(&page, &template, W, H, W, H, &AlignConfig::default());
    assert_eq!(fitted.model, TransformModel::Affine);
}

#[test]
fn disabled_homography_starts_at_affine() {
    let template = template_set();
    let motion = Matrix3::new(0.95, 0.0, 12.0, 0.0, 0.93, -8.0, 0.0, 0.0, 1.0);
    let page = map_set(&template, &motion);
    let cfg = AlignConfig {
        allow_homography: false,
        ..AlignConfig::default()
    };
    let fitted = fit_transform(&page, &template, W, H, W, H, &cfg);
    assert_eq!(fitted.model, TransformModel::Affine);
    let back = project(&fitted.matrix, project(&motion, Point2::new(400.0, 600.0)));
    assert!(back.distance(Point2::new(400.0, 600.0)) <= 1e-6);
}

#[test]
fn collapsing_fit_is_forced_to_similarity() {
    // Every template fiducial inside a 40 pixel box: any exact fit maps the
    // page to a sliver of the canvas and fails the content gate.
    let template = FiducialSet::new(
        Point2::new(500.0, 500.0),
        Point2::new(540.0, 500.0),
        Point2::new(540.0, 510.0),
        Point2::new(505.0, 505.0),
        Point2::new(505.0, 535.0),
    );
    let page = template_set();
    let fitted = fit_transform(&page, &template, W, H, W, H, &AlignConfig::default());
    assert_eq!(fitted.model, TransformModel::Similarity);
    assert_eq!(fitted.sx, fitted.sy);
    // The similarity still anchors the top dash exactly.
    let mapped = project(&fitted.matrix, page.dash_top);
    assert!(mapped.distance(template.dash_top) < 1e-9);
}

#[test]
fn axis_fit_translation_resists_one_outlier() {
    let template = template_set();
    // Page shifted down by 10, except the left header endpoint which is off
    // by 100. The median keeps the translation at the consensus value where
    // a mean would drag it by a quarter of the outlier.
    let page = FiducialSet::new(
        Point2::new(10.0, 151.5),
        Point2::new(990.0, 61.5),
        Point2::new(990.0, 209.5),
        Point2::new(50.5, 89.5),
        Point2::new(50.5, 929.5),
    );
    let cfg = AlignConfig {
        strategy: FitStrategy::AxisFit,
        ..AlignConfig::default()
    };
    let fitted = fit_transform(&page, &template, W, H, W, H, &cfg);
    assert_eq!(fitted.model, TransformModel::AxisFit);
    assert!((fitted.sy - 1.0).abs() < 1e-9);
    assert!((fitted.ty + 10.0).abs() < 1e-9, "ty {}", fitted.ty);
}

#[test]
fn axis_fit_scales_are_clamped() {
    let template = template_set();
    // Dash span half the template's would ask for a vertical scale of 2.
    let page = FiducialSet::new(
        Point2::new(10.0, 51.5),
        Point2::new(990.0, 51.5),
        Point2::new(990.0, 199.5),
        Point2::new(50.5, 79.5),
        Point2::new(50.5, 499.5),
    );
    let cfg = AlignConfig {
        strategy: FitStrategy::AxisFit,
        ..AlignConfig::default()
    };
    let fitted = fit_transform(&page, &template, W, H, W, H, &cfg);
    assert_eq!(fitted.sy, cfg.sy_clamp.1);
    assert!((fitted.sx - 1.0).abs() < 1e-9);
}
