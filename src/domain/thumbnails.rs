use url::Url;

use crate::domain::errors::ThumbnailError;

/// Content type of every generated thumbnail. The path grammar only serves `.jpg`.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Content type of both placeholder images.
pub const PLACEHOLDER_CONTENT_TYPE: &str = "image/png";

/// Target size of a thumbnail, in pixels. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    /// Validate raw path values against `1..=max` on both axes.
    pub fn new(width: u64, height: u64, max: u32) -> Result<Self, ThumbnailError> {
        let bounded = |value: u64| u32::try_from(value).ok().filter(|v| (1..=max).contains(v));
        match (bounded(width), bounded(height)) {
            (Some(width), Some(height)) => Ok(Self { width, height }),
            _ => Err(ThumbnailError::InvalidDimensions { width, height, max }),
        }
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }
}

/// A decoded thumbnail request: where the source lives and how big the result is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    source_url: Url,
    dimensions: Dimensions,
}

impl ThumbnailRequest {
    pub fn new(source_url: Url, dimensions: Dimensions) -> Self {
        Self {
            source_url,
            dimensions,
        }
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Which fallback image to serve in place of a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// The request path is not a thumbnail path at all.
    NotFound,
    /// The path was a thumbnail path but the thumbnail could not be produced.
    Broken,
}

impl PlaceholderKind {
    pub const ALL: [PlaceholderKind; 2] = [PlaceholderKind::NotFound, PlaceholderKind::Broken];

    /// File name used when loading overrides from a static directory.
    pub fn file_name(self) -> &'static str {
        match self {
            PlaceholderKind::NotFound => "not-found.png",
            PlaceholderKind::Broken => "broken.png",
        }
    }
}

/// Encoded thumbnail bytes ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}
