mod common;

use std::fs;
use std::path::PathBuf;

use image::{GrayImage, Luma};
use omralign::cache::{load_or_build_dash_patch, template_fingerprint};

fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("omralign_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn saved_template(dir: &PathBuf) -> (GrayImage, PathBuf) {
    let template = common::synthetic_template();
    let path = dir.join("template.png");
    template.save(&path).unwrap();
    (template, path)
}

#[test]
fn miss_extracts_and_writes_the_entry() {
    let dir = workspace("cache_miss");
    let (template, tpl_path) = saved_template(&dir);
    let cache_dir = dir.join("cache");

    let patch = load_or_build_dash_patch(&template, &tpl_path, &cache_dir)
        .unwrap()
        .expect("patch extracted");
    let (w, h) = patch.dimensions();
    assert!((20..=32).contains(&w), "patch width {w}");
    assert!((10..=20).contains(&h), "patch height {h}");

    let fp = template_fingerprint(&tpl_path).unwrap();
    let entry = cache_dir.join(format!("dash_{fp}.png"));
    assert!(entry.is_file(), "missing {}", entry.display());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn hit_loads_the_entry_instead_of_extracting() {
    let dir = workspace("cache_hit");
    let (template, tpl_path) = saved_template(&dir);
    let cache_dir = dir.join("cache");
    let fp = template_fingerprint(&tpl_path).unwrap();
    let entry = cache_dir.join(format!("dash_{fp}.png"));

    // Plant a valid patch of a size extraction would never produce. If the
    // returned patch has that size, it came from the cache.
    fs::create_dir_all(&cache_dir).unwrap();
    let planted = GrayImage::from_fn(9, 9, |x, _| {
        if x < 4 {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });
    planted.save(&entry).unwrap();

    let patch = load_or_build_dash_patch(&template, &tpl_path, &cache_dir)
        .unwrap()
        .expect("patch loaded");
    assert_eq!(patch.dimensions(), (9, 9));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn corrupt_entry_is_replaced_by_a_fresh_extraction() {
    let dir = workspace("cache_corrupt");
    let (template, tpl_path) = saved_template(&dir);
    let cache_dir = dir.join("cache");
    let fp = template_fingerprint(&tpl_path).unwrap();
    let entry = cache_dir.join(format!("dash_{fp}.png"));

    fs::create_dir_all(&cache_dir).unwrap();
    fs::write(&entry, b"not an image").unwrap();

    let patch = load_or_build_dash_patch(&template, &tpl_path, &cache_dir)
        .unwrap()
        .expect("patch rebuilt");
    let (w, _) = patch.dimensions();
    assert!((20..=32).contains(&w), "patch width {w}");
    // The slot now holds a decodable image again.
    assert!(omralign::io::load_gray(&entry).is_ok());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn fingerprint_tracks_template_content() {
    let dir = workspace("cache_fp");
    let (_, tpl_path) = saved_template(&dir);

    let fp = template_fingerprint(&tpl_path).unwrap();
    assert_eq!(fp.len(), 16);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(fp, template_fingerprint(&tpl_path).unwrap());

    let mut edited = common::synthetic_template();
    edited.put_pixel(500, 500, Luma([0]));
    edited.save(&tpl_path).unwrap();
    assert_ne!(fp, template_fingerprint(&tpl_path).unwrap());

    let _ = fs::remove_dir_all(&dir);
}
