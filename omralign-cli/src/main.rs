//! Batch alignment of scanned answer sheets.
//!
//! Reads every page image from an input directory, aligns it to the given
//! template, and writes the registered page to the output directory as PNG.
//! Pages are processed in parallel; set `RUST_LOG=info` for per-page
//! measurements.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use image::Luma;
use imageproc::drawing::{draw_cross_mut, draw_filled_circle_mut, Canvas};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use omralign::{AlignConfig, Aligner, DashPatch, FiducialSet, FitStrategy, Template};

#[derive(Parser, Debug)]
#[command(name = "omralign", about = "Align scanned answer sheets to a template")]
struct Args {
    /// Template image the pages are registered to.
    #[arg(short, long)]
    template: PathBuf,

    /// Directory of scanned pages.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the aligned pages are written to.
    #[arg(short, long)]
    output: PathBuf,

    /// Comma-separated list of input file extensions.
    #[arg(long, default_value = "jpg,jpeg,png")]
    extensions: String,

    /// Explicit dash patch image, bypassing extraction and cache.
    #[arg(long)]
    dash_patch: Option<PathBuf>,

    /// Directory for the content-addressed dash patch cache.
    #[arg(long, default_value = ".dash_cache")]
    dash_cache_dir: PathBuf,

    /// Skip the dash patch cache entirely.
    #[arg(long)]
    no_cache: bool,

    /// Half-width of the anchored search bands, as a page fraction.
    #[arg(long, default_value_t = 0.05)]
    tight: f64,

    /// Correlation score a dash match must reach.
    #[arg(long, default_value_t = 0.55)]
    match_threshold: f32,

    /// Accepted horizontal scale range for the axis fit, as "min,max".
    #[arg(long, value_parser = parse_clamp, default_value = "0.8,1.25")]
    sx_clamp: (f64, f64),

    /// Accepted vertical scale range for the axis fit, as "min,max".
    #[arg(long, value_parser = parse_clamp, default_value = "0.8,1.25")]
    sy_clamp: (f64, f64),

    /// Never fit a homography; start the cascade at affine.
    #[arg(long)]
    disable_homography: bool,

    /// Use the axis-fit strategy instead of the cascade.
    #[arg(long)]
    axis_fit: bool,

    /// Warp the original color pages instead of their grayscale versions.
    #[arg(long)]
    color: bool,

    /// Stamp corner bullseyes onto the aligned pages.
    #[arg(long)]
    bulls: bool,

    /// Corner inset of the bullseye centers, in pixels.
    #[arg(long, default_value_t = 22)]
    bull_margin: i32,

    /// Outer bullseye radius, in pixels.
    #[arg(long, default_value_t = 16)]
    bull_radius: i32,

    /// Write per-page debug images marking the detected fiducials on the
    /// deskewed page, plus one for the template.
    #[arg(long)]
    write_debug: bool,

    /// Write a JSON report of per-page measurements to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn parse_clamp(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"min,max\", got {s:?}"))?;
    let lo: f64 = lo.trim().parse().map_err(|e| format!("bad min: {e}"))?;
    let hi: f64 = hi.trim().parse().map_err(|e| format!("bad max: {e}"))?;
    if lo <= 0.0 || hi < lo {
        return Err(format!("invalid range {lo}..{hi}"));
    }
    Ok((lo, hi))
}

#[derive(Serialize)]
struct PageReport {
    file: String,
    angle_deg: f64,
    model: &'static str,
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let config = AlignConfig {
        tight: args.tight,
        match_threshold: args.match_threshold,
        sx_clamp: args.sx_clamp,
        sy_clamp: args.sy_clamp,
        allow_homography: !args.disable_homography,
        strategy: if args.axis_fit {
            FitStrategy::AxisFit
        } else {
            FitStrategy::Cascade
        },
        ..AlignConfig::default()
    };

    let template_gray = omralign::io::load_gray(&args.template)?;
    let patch = if let Some(path) = &args.dash_patch {
        Some(DashPatch::new(omralign::io::load_gray(path)?)?)
    } else if args.no_cache {
        None
    } else {
        let (deskewed, _angle) = omralign::deskew::deskew(&template_gray, &config);
        omralign::cache::load_or_build_dash_patch(&deskewed, &args.template, &args.dash_cache_dir)?
    };
    let template = match patch {
        Some(patch) => Template::with_patch(&template_gray, Some(patch), &config)?,
        None => Template::from_image(&template_gray, &config)?,
    };
    let aligner = Aligner::with_config(template, config);

    fs::create_dir_all(&args.output)?;
    if args.write_debug {
        let (mut tpl_debug, _angle) = omralign::deskew::deskew(&template_gray, aligner.config());
        overlay_fiducials(&mut tpl_debug, aligner.template().fiducials());
        let debug_path = args.output.join("template_debug.png");
        if let Err(err) = tpl_debug.save(&debug_path) {
            warn!(%err, "failed to write template debug image");
        }
    }
    let pages = collect_pages(&args.input, &args.extensions)?;
    info!(count = pages.len(), "aligning pages");

    let mut reports: Vec<PageReport> = pages
        .par_iter()
        .filter_map(|path| align_one(path, &aligner, &args))
        .collect();
    reports.sort_by(|a, b| a.file.cmp(&b.file));
    info!(aligned = reports.len(), skipped = pages.len() - reports.len(), "done");

    if let Some(report_path) = &args.report {
        let file = fs::File::create(report_path)?;
        serde_json::to_writer_pretty(file, &reports)?;
    }
    Ok(())
}

fn collect_pages(input: &Path, extensions: &str) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let wanted: Vec<String> = extensions
        .split(',')
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    let mut pages: Vec<PathBuf> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| wanted.iter().any(|w| w == &e.to_ascii_lowercase()))
                .unwrap_or(false)
        })
        .collect();
    pages.sort();
    Ok(pages)
}

fn align_one(path: &Path, aligner: &Aligner, args: &Args) -> Option<PageReport> {
    let gray = match omralign::io::load_gray(path) {
        Ok(gray) => gray,
        Err(err) => {
            warn!(page = %path.display(), %err, "skipping unreadable page");
            return None;
        }
    };
    let alignment = aligner.align(&gray);

    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let out_path = args.output.join(format!("{stem}.png"));
    let save_result = if args.color {
        match omralign::io::load_rgb(path) {
            Ok(rgb) => {
                let mut out = alignment.warp_rgb(&rgb);
                if args.bulls {
                    stamp_bullseyes(&mut out, aligner, args, image::Rgb([0, 0, 0]), image::Rgb([255, 255, 255]));
                }
                out.save(&out_path)
            }
            Err(err) => {
                warn!(page = %path.display(), %err, "skipping unreadable page");
                return None;
            }
        }
    } else {
        let mut out = alignment.warp_gray(&gray);
        if args.bulls {
            stamp_bullseyes(&mut out, aligner, args, Luma([0]), Luma([255]));
        }
        out.save(&out_path)
    };
    if let Err(err) = save_result {
        warn!(page = %path.display(), %err, "failed to write aligned page");
        return None;
    }

    // Debug overlays go to a separate image so the aligned output stays
    // clean for mark reading.
    if args.write_debug {
        let mut debug = alignment.deskewed_gray(&gray);
        overlay_fiducials(&mut debug, &alignment.fiducials);
        let debug_path = args.output.join(format!("{stem}_debug.png"));
        if let Err(err) = debug.save(&debug_path) {
            warn!(page = %path.display(), %err, "failed to write debug image");
        }
    }

    info!(
        page = %path.display(),
        angle_deg = alignment.angle_deg,
        model = alignment.transform.model.as_str(),
        sx = alignment.transform.sx,
        sy = alignment.transform.sy,
        "page aligned"
    );
    Some(PageReport {
        file: path.file_name()?.to_string_lossy().into_owned(),
        angle_deg: alignment.angle_deg,
        model: alignment.transform.model.as_str(),
        sx: alignment.transform.sx,
        sy: alignment.transform.sy,
        tx: alignment.transform.tx,
        ty: alignment.transform.ty,
    })
}

fn stamp_bullseyes<C>(canvas: &mut C, aligner: &Aligner, args: &Args, dark: C::Pixel, light: C::Pixel)
where
    C: Canvas,
    C::Pixel: Copy,
{
    let (w, h) = aligner.template().dimensions();
    let inset = args.bull_margin + args.bull_radius;
    let right = w as i32 - 1 - inset;
    let bottom = h as i32 - 1 - inset;
    for center in [(inset, inset), (right, inset), (inset, bottom), (right, bottom)] {
        draw_bullseye(canvas, center, args.bull_radius, dark, light);
    }
}

fn overlay_fiducials(img: &mut image::GrayImage, fids: &FiducialSet) {
    for p in [
        fids.header_left,
        fids.header_right,
        fids.thin_right,
        fids.dash_top,
        fids.dash_bottom,
    ] {
        draw_cross_mut(img, Luma([0]), p.x as i32, p.y as i32);
    }
}

fn draw_bullseye<C>(canvas: &mut C, center: (i32, i32), radius: i32, dark: C::Pixel, light: C::Pixel)
where
    C: Canvas,
    C::Pixel: Copy,
{
    draw_filled_circle_mut(canvas, center, radius, dark);
    draw_filled_circle_mut(canvas, center, (radius as f32 * 0.55) as i32, light);
    draw_filled_circle_mut(canvas, center, (radius as f32 * 0.25) as i32, dark);
    draw_filled_circle_mut(canvas, center, (radius / 10).max(1), light);
}
