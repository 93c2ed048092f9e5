pub mod errors;
pub mod ports;
pub mod thumbnails;
pub mod tokens;

// Re-exports
pub use errors::{DecodeError, FetchError, PipelineError, ThumbnailError};
pub use thumbnails::{Dimensions, PlaceholderKind, Thumbnail, ThumbnailRequest};
