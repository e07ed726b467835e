//! Data directory resolution and `lens.toml` loading.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use lens_core::LensParams;

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "LENS_DATA_DIR";
pub const CONFIG_FILE: &str = "lens.toml";
pub const DB_FILE: &str = "lens.db";

fn default_base_dir() -> PathBuf {
    dirs_home().join(".resonance-lens")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Data directory: `explicit`, else `$LENS_DATA_DIR`, else `~/.resonance-lens`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => default_base_dir(),
    }
}

/// Parse lens parameters from TOML text. Missing sections and keys keep
/// their defaults; the result is sanitized.
pub fn parse_params(text: &str, origin: &Path) -> Result<LensParams> {
    let params: LensParams = toml::from_str(text).map_err(|e| StoreError::Config {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(params.sanitized())
}

/// Load parameters from `path`. A missing file means defaults.
pub fn load_params(path: &Path) -> Result<LensParams> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let params = parse_params(&text, path)?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(params)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(LensParams::default())
        }
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Create `dir` if needed and open its database.
pub fn open_store(dir: &Path) -> Result<Store> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    Store::open(&dir.join(DB_FILE))
}
