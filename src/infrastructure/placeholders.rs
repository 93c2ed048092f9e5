use std::path::{Path, PathBuf};

use axum::body::Bytes;
use image::ImageFormat;
use thiserror::Error;
use tracing::info;

use crate::domain::thumbnails::PlaceholderKind;

static EMBEDDED_NOT_FOUND: &[u8] = include_bytes!("../../static/not-found.png");
static EMBEDDED_BROKEN: &[u8] = include_bytes!("../../static/broken.png");

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error("failed to read placeholder {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("placeholder {path} is not a PNG image")]
    NotPng { path: PathBuf },
}

/// The two fallback images. Loaded once at startup and never mutated;
/// clones share the same buffers.
#[derive(Debug, Clone)]
pub struct Placeholders {
    not_found: Bytes,
    broken: Bytes,
}

impl Placeholders {
    /// Placeholders compiled into the binary.
    pub fn embedded() -> Self {
        Self {
            not_found: Bytes::from_static(EMBEDDED_NOT_FOUND),
            broken: Bytes::from_static(EMBEDDED_BROKEN),
        }
    }

    /// Load `not-found.png` and `broken.png` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, PlaceholderError> {
        let placeholders = Self {
            not_found: read_png(&dir.join(PlaceholderKind::NotFound.file_name()))?,
            broken: read_png(&dir.join(PlaceholderKind::Broken.file_name()))?,
        };
        info!(dir = %dir.display(), "loaded placeholder images");
        Ok(placeholders)
    }

    /// Fallback image for `kind`. Always a PNG.
    pub fn resolve(&self, kind: PlaceholderKind) -> Bytes {
        match kind {
            PlaceholderKind::NotFound => self.not_found.clone(),
            PlaceholderKind::Broken => self.broken.clone(),
        }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::embedded()
    }
}

fn read_png(path: &Path) -> Result<Bytes, PlaceholderError> {
    let data = std::fs::read(path).map_err(|source| PlaceholderError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if !matches!(image::guess_format(&data), Ok(ImageFormat::Png)) {
        return Err(PlaceholderError::NotPng {
            path: path.to_path_buf(),
        });
    }

    Ok(Bytes::from(data))
}
