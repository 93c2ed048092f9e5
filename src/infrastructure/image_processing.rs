use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Limits, RgbImage};

use crate::domain::errors::ThumbnailError;
use crate::domain::ports::ThumbnailGenerator;
use crate::domain::thumbnails::{Dimensions, THUMBNAIL_CONTENT_TYPE, Thumbnail};

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Largest source image side accepted for decoding.
const MAX_SOURCE_SIDE: u32 = 16_384;
/// Upper bound on decoder allocations (256 MiB).
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Crop-to-fill JPEG thumbnails. The source is scaled to cover the target
/// box and the overflow is cropped evenly from both sides.
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    jpeg_quality: u8,
}

impl ImageProcessor {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

#[async_trait]
impl ThumbnailGenerator for ImageProcessor {
    async fn resize(
        &self,
        source: Vec<u8>,
        dimensions: Dimensions,
    ) -> Result<Thumbnail, ThumbnailError> {
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || render_thumbnail(&source, dimensions, quality))
            .await
            .map_err(|err| ThumbnailError::TaskFailed(err.to_string()))?
    }
}

/// Decode `source`, crop-to-fill it to `dimensions` and encode it as JPEG.
pub fn render_thumbnail(
    source: &[u8],
    dimensions: Dimensions,
    jpeg_quality: u8,
) -> Result<Thumbnail, ThumbnailError> {
    let image = decode_image(source)?;
    let resized = image.resize_to_fill(
        dimensions.width(),
        dimensions.height(),
        FilterType::Lanczos3,
    );
    let data = encode_jpeg(&flatten(resized), jpeg_quality)?;

    Ok(Thumbnail {
        data,
        content_type: THUMBNAIL_CONTENT_TYPE,
    })
}

fn decode_image(source: &[u8]) -> Result<DynamicImage, ThumbnailError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_SIDE);
    limits.max_image_height = Some(MAX_SOURCE_SIDE);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;
    if reader.format().is_none() {
        return Err(ThumbnailError::Decode("unrecognised image format".to_string()));
    }
    reader.limits(limits);

    reader
        .decode()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))
}

/// JPEG has no alpha channel, so composite transparent pixels onto white.
fn flatten(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |channel: u8| {
            let value = u16::from(channel) * u16::from(a) + 255 * (255 - u16::from(a));
            u8::try_from(value / 255).unwrap_or(u8::MAX)
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
    let mut data = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut data, quality);
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgb8.into(),
        )
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    Ok(data)
}
