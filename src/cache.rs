//! Content-addressed cache for extracted dash patches.
//!
//! The patch is keyed by a digest of the template file bytes, so editing the
//! template invalidates the cached patch automatically while re-runs against
//! the same template skip extraction.

use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use sha2::{Digest, Sha256};

use crate::image::io::load_gray;
use crate::template::{extract_dash_patch, DashPatch};
use crate::trace::trace_event;
use crate::util::{AlignError, AlignResult};

/// First 16 hex characters of the SHA-256 of the template file bytes.
pub fn template_fingerprint<P: AsRef<Path>>(path: P) -> AlignResult<String> {
    let bytes = fs::read(path).map_err(|err| AlignError::CacheIo {
        reason: err.to_string(),
    })?;
    let digest = Sha256::digest(&bytes);
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{byte:02x}"));
    }
    Ok(hex)
}

fn patch_path(cache_dir: &Path, fingerprint: &str) -> PathBuf {
    cache_dir.join(format!("dash_{fingerprint}.png"))
}

/// Loads the cached dash patch for a template, or extracts and caches one.
///
/// `template_gray` must already be deskewed. Returns `Ok(None)` when the
/// template's margin strip yields no usable patch; detection then runs on
/// connected components instead. A cache write failure is not fatal, the
/// freshly extracted patch is still returned.
pub fn load_or_build_dash_patch(
    template_gray: &GrayImage,
    template_path: &Path,
    cache_dir: &Path,
) -> AlignResult<Option<DashPatch>> {
    let fingerprint = template_fingerprint(template_path)?;
    let path = patch_path(cache_dir, &fingerprint);

    if path.is_file() {
        match load_gray(&path).and_then(DashPatch::new) {
            Ok(patch) => {
                trace_event!("dash_patch_cache_hit", fingerprint = fingerprint.as_str());
                return Ok(Some(patch));
            }
            Err(_) => {
                // Corrupt cache entry, rebuild below.
                let _ = fs::remove_file(&path);
            }
        }
    }

    let Some(patch) = extract_dash_patch(template_gray) else {
        return Ok(None);
    };
    if let Err(err) = fs::create_dir_all(cache_dir)
        .map_err(|e| e.to_string())
        .and_then(|()| patch.image().save(&path).map_err(|e| e.to_string()))
    {
        trace_event!("dash_patch_cache_write_failed", reason = err.as_str());
    }
    Ok(Some(patch))
}
