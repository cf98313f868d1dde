//! Fiducial-based alignment of scanned answer sheets.
//!
//! Every sheet carries three printed landmarks: a long header line near the
//! top, a thin rule below it, and a column of dash markers in the left
//! margin. This crate deskews a scanned page from the header line, locates
//! the five fiducial points those landmarks define, fits a page-to-template
//! transform from the correspondences, and warps the page onto the template
//! canvas so downstream mark reading sees every answer box in a known place.
//!
//! The fitter is a fallback cascade: a homography when all four independent
//! correspondences are usable and plausible, an affine when the thin rule is
//! degenerate, and a dash-span similarity as the floor that cannot fail. An
//! alternative axis-fit strategy estimates per-axis scale with median
//! translation for layouts whose thin rule is unreliable.
//!
//! ```no_run
//! use omralign::{Aligner, AlignConfig, Template};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template_img = omralign::io::load_gray("template.png")?;
//! let template = Template::from_image(&template_img, &AlignConfig::default())?;
//! let aligner = Aligner::new(template);
//!
//! let page = omralign::io::load_gray("scan_001.jpg")?;
//! let alignment = aligner.align(&page);
//! let registered = alignment.warp_gray(&page);
//! # Ok(())
//! # }
//! ```
//!
//! Enable the `tracing` feature to get per-page spans and measurements
//! (deskew angle, chosen model, scale and translation) through the
//! [`tracing`](https://docs.rs/tracing) ecosystem.

pub mod cache;
pub mod deskew;
mod detect;
pub mod fit;
pub mod geom;
mod image;
pub mod pipeline;
pub mod template;
pub mod warp;

mod trace;
mod util;

pub use crate::fit::{fit_transform, PageTransform};
pub use crate::geom::transform::TransformModel;
pub use crate::geom::{FiducialSet, NormalizedFiducials, Point2};
pub use crate::image::io;
pub use crate::image::{crop, Roi};
pub use crate::pipeline::{AlignConfig, Aligner, Alignment, FitStrategy};
pub use crate::template::{DashPatch, Template};
pub use crate::util::{AlignError, AlignResult};
pub use crate::warp::{warp_gray, warp_rgb, Border};
