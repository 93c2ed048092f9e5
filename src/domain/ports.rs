use async_trait::async_trait;
use url::Url;

use crate::domain::errors::{FetchError, ThumbnailError};
use crate::domain::thumbnails::{Dimensions, Thumbnail};

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Retrieve the raw bytes at `url` in a single attempt.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Decode `source` as an image and produce an encoded thumbnail of exactly `dimensions`.
    async fn resize(
        &self,
        source: Vec<u8>,
        dimensions: Dimensions,
    ) -> Result<Thumbnail, ThumbnailError>;
}
