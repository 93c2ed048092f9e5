use thiserror::Error;

/// Failure to turn a path token back into a source URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is not valid base64: {0}")]
    InvalidBase64(String),
    #[error("token does not decode to UTF-8 text")]
    InvalidUtf8,
    #[error("token does not decode to an absolute URL: {0}")]
    InvalidUrl(String),
}

impl DecodeError {
    /// How far decoding got before failing; used to report the most specific error.
    pub(crate) fn depth(&self) -> u8 {
        match self {
            DecodeError::InvalidBase64(_) => 0,
            DecodeError::InvalidUtf8 => 1,
            DecodeError::InvalidUrl(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThumbnailError {
    #[error("invalid thumbnail dimensions {width}x{height} (must be between 1 and {max})")]
    InvalidDimensions { width: u64, height: u64, max: u32 },
    #[error("source is not a recognised image: {0}")]
    Decode(String),
    #[error("failed to encode thumbnail: {0}")]
    Encode(String),
    #[error("thumbnail task failed: {0}")]
    TaskFailed(String),
}

/// Any failure after the request path matched the thumbnail grammar.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Decode(_) => "decode",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Thumbnail(ThumbnailError::InvalidDimensions { .. }) => "parse",
            PipelineError::Thumbnail(_) => "resize",
        }
    }
}
