//! Path → decode → fetch → resize, with every failure mapped to a placeholder.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::PipelineError;
use crate::domain::ports::{ImageFetcher, ThumbnailGenerator};
use crate::domain::thumbnails::{Dimensions, PlaceholderKind, Thumbnail, ThumbnailRequest};
use crate::domain::tokens;

/// The only extension the path grammar accepts.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// A request path that matched `/{token}_{width}_{height}.jpg`.
///
/// `width` and `height` are only known to be digit strings here; values too
/// large for `u64` saturate and are rejected later as invalid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailPath<'a> {
    pub token: &'a str,
    pub width: u64,
    pub height: u64,
}

/// Match `path` against the thumbnail grammar.
///
/// The token itself may contain `_` (it stands in for base64 `/`), so the
/// dimensions are split off from the right.
pub fn parse_path(path: &str) -> Option<ThumbnailPath<'_>> {
    let name = path.strip_prefix('/')?;
    if name.contains('/') {
        return None;
    }

    let (stem, extension) = name.rsplit_once('.')?;
    if extension != THUMBNAIL_EXTENSION || stem.contains('.') {
        return None;
    }

    let (rest, height) = stem.rsplit_once('_')?;
    let (token, width) = rest.rsplit_once('_')?;
    if token.is_empty() {
        return None;
    }

    Some(ThumbnailPath {
        token,
        width: parse_digits(width)?,
        height: parse_digits(height)?,
    })
}

/// Build the request path for a thumbnail of `source_url`.
pub fn thumbnail_path(source_url: &str, width: u32, height: u32) -> String {
    format!(
        "/{}_{width}_{height}.{THUMBNAIL_EXTENSION}",
        tokens::encode(source_url)
    )
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(value.parse().unwrap_or(u64::MAX))
}

/// Outcome of a thumbnail request. Every outcome is served with status 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailResponse {
    Generated(Thumbnail),
    Placeholder(PlaceholderKind),
}

#[derive(Clone)]
pub struct ThumbnailPipeline {
    fetcher: Arc<dyn ImageFetcher>,
    generator: Arc<dyn ThumbnailGenerator>,
    max_dimension: u32,
}

impl ThumbnailPipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        generator: Arc<dyn ThumbnailGenerator>,
        max_dimension: u32,
    ) -> Self {
        Self {
            fetcher,
            generator,
            max_dimension,
        }
    }

    /// Run one request path through the pipeline. Never fails.
    pub async fn handle(&self, path: &str) -> ThumbnailResponse {
        let Some(parsed) = parse_path(path) else {
            debug!(path, "not a thumbnail path");
            return ThumbnailResponse::Placeholder(PlaceholderKind::NotFound);
        };

        match self.generate(parsed).await {
            Ok(thumbnail) => ThumbnailResponse::Generated(thumbnail),
            Err(err) => {
                warn!(path, stage = err.stage(), error = %err, "thumbnail request failed");
                ThumbnailResponse::Placeholder(PlaceholderKind::Broken)
            }
        }
    }

    async fn generate(&self, parsed: ThumbnailPath<'_>) -> Result<Thumbnail, PipelineError> {
        let (_, source_url) = tokens::decode_url(parsed.token)?;
        let dimensions = Dimensions::new(parsed.width, parsed.height, self.max_dimension)?;
        let request = ThumbnailRequest::new(source_url, dimensions);

        let source = self.fetcher.fetch(request.source_url()).await?;
        let thumbnail = self
            .generator
            .resize(source, request.dimensions())
            .await?;

        debug!(
            url = %request.source_url(),
            width = dimensions.width(),
            height = dimensions.height(),
            bytes = thumbnail.data.len(),
            "generated thumbnail"
        );
        Ok(thumbnail)
    }
}
