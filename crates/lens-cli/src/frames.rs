//! Frame files: binary PPM (`P6`, 8-bit RGB).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lens_core::Surface;

pub fn encode_ppm(surface: &Surface) -> Vec<u8> {
    let header = format!("P6\n{} {}\n255\n", surface.width, surface.height);
    let mut out = Vec::with_capacity(header.len() + surface.rgb.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&surface.rgb);
    out
}

pub fn write_ppm(path: &Path, surface: &Surface) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, encode_ppm(surface))
        .with_context(|| format!("failed to write {}", path.display()))
}

/// `dir/frame_00042.ppm`
pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:05}.ppm"))
}
