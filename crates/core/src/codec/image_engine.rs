//! Built-in codec engine for still-image formats.
//!
//! Decoding and most encoding goes through the `image` crate; lossy WebP
//! output uses the `webp` crate since the `image` crate only writes lossless
//! WebP. Codec work runs under `tokio::task::spawn_blocking` so the async
//! runtime is never blocked by a large decode.

use async_trait::async_trait;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};
use std::io::Cursor;
use tokio::sync::mpsc;
use tracing::debug;

use crate::media::{Dimensions, MediaFormat};

use super::error::CodecError;
use super::traits::CodecEngine;
use super::types::{EncodeOptions, OperationKind, TaskOutput, TaskProgress, TaskRequest};

/// Default quality for lossy targets when the request does not specify one.
const DEFAULT_QUALITY: u8 = 80;

/// Codec engine for still images.
#[derive(Debug, Default)]
pub struct ImageEngine;

impl ImageEngine {
    /// Creates a new image engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CodecEngine for ImageEngine {
    fn name(&self) -> &str {
        "image"
    }

    async fn validate(&self) -> Result<(), CodecError> {
        // Pure in-process codecs, nothing external to check.
        Ok(())
    }

    async fn run(
        &self,
        request: TaskRequest,
        progress: Option<mpsc::Sender<TaskProgress>>,
    ) -> Result<TaskOutput, CodecError> {
        match request.operation {
            OperationKind::Convert => convert(request, progress).await,
            OperationKind::Decode => decode(request, progress).await,
            OperationKind::Encode => encode(request, progress).await,
        }
    }
}

/// Best-effort progress tick. Dropped when the channel is full or closed.
fn report(progress: &Option<mpsc::Sender<TaskProgress>>, percent: u8, stage: &str) {
    if let Some(tx) = progress {
        let _ = tx.try_send(TaskProgress {
            percent,
            stage: stage.to_string(),
        });
    }
}

fn image_format(format: MediaFormat) -> Result<image::ImageFormat, CodecError> {
    format
        .image_format()
        .ok_or(CodecError::UnsupportedFormat { format })
}

async fn convert(
    request: TaskRequest,
    progress: Option<mpsc::Sender<TaskProgress>>,
) -> Result<TaskOutput, CodecError> {
    let target = request
        .target_format
        .ok_or_else(|| CodecError::invalid_task("convert requires a target format"))?;
    let source = request.source_format;
    image_format(source)?;
    image_format(target)?;

    debug!("Converting {:?} -> {:?} ({} bytes)", source, target, request.payload.len());

    report(&progress, 10, "decode");
    let payload = request.payload;
    let img = tokio::task::spawn_blocking(move || decode_dynamic(&payload, source))
        .await
        .map_err(|e| CodecError::decode_failed(format!("decode task panicked: {e}")))??;

    let dimensions = Dimensions {
        width: img.width(),
        height: img.height(),
    };

    report(&progress, 55, "encode");
    let options = request.options;
    let encoded = tokio::task::spawn_blocking(move || encode_dynamic(&img, target, &options))
        .await
        .map_err(|e| CodecError::encode_failed(format!("encode task panicked: {e}")))??;
    report(&progress, 100, "encode");

    Ok(TaskOutput {
        payload: encoded,
        dimensions: Some(dimensions),
    })
}

async fn decode(
    request: TaskRequest,
    progress: Option<mpsc::Sender<TaskProgress>>,
) -> Result<TaskOutput, CodecError> {
    let source = request.source_format;
    image_format(source)?;

    report(&progress, 10, "decode");
    let payload = request.payload;
    let img = tokio::task::spawn_blocking(move || decode_dynamic(&payload, source))
        .await
        .map_err(|e| CodecError::decode_failed(format!("decode task panicked: {e}")))??;
    report(&progress, 100, "decode");

    let dimensions = Dimensions {
        width: img.width(),
        height: img.height(),
    };

    Ok(TaskOutput {
        payload: img.to_rgba8().into_raw(),
        dimensions: Some(dimensions),
    })
}

async fn encode(
    request: TaskRequest,
    progress: Option<mpsc::Sender<TaskProgress>>,
) -> Result<TaskOutput, CodecError> {
    let target = request
        .target_format
        .ok_or_else(|| CodecError::invalid_task("encode requires a target format"))?;
    image_format(target)?;

    let dimensions = request
        .options
        .raw_dimensions
        .ok_or(CodecError::MissingDimensions)?;

    let expected = dimensions.width as usize * dimensions.height as usize * 4;
    if request.payload.len() != expected {
        return Err(CodecError::invalid_task(format!(
            "raw payload is {} bytes, expected {} for {}x{} RGBA8",
            request.payload.len(),
            expected,
            dimensions.width,
            dimensions.height
        )));
    }

    report(&progress, 10, "encode");
    let options = request.options;
    let payload = request.payload;
    let encoded = tokio::task::spawn_blocking(move || {
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(dimensions.width, dimensions.height, payload)
                .ok_or_else(|| CodecError::invalid_task("raw payload does not fit dimensions"))?;
        encode_dynamic(&DynamicImage::ImageRgba8(buffer), target, &options)
    })
    .await
    .map_err(|e| CodecError::encode_failed(format!("encode task panicked: {e}")))??;
    report(&progress, 100, "encode");

    Ok(TaskOutput {
        payload: encoded,
        dimensions: Some(dimensions),
    })
}

/// Decodes a container payload into a [`DynamicImage`].
pub(crate) fn decode_dynamic(bytes: &[u8], format: MediaFormat) -> Result<DynamicImage, CodecError> {
    let fmt = format
        .image_format()
        .ok_or(CodecError::UnsupportedFormat { format })?;
    image::load_from_memory_with_format(bytes, fmt)
        .map_err(|e| CodecError::decode_failed(e.to_string()))
}

/// Encodes a [`DynamicImage`] into the target container.
pub(crate) fn encode_dynamic(
    img: &DynamicImage,
    target: MediaFormat,
    options: &EncodeOptions,
) -> Result<Vec<u8>, CodecError> {
    let quality = options.quality.unwrap_or(DEFAULT_QUALITY).clamp(1, 100);
    let mut out = Vec::new();

    match target {
        MediaFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| CodecError::encode_failed(e.to_string()))?;
        }
        MediaFormat::Png => {
            let compression = match options.compression_level {
                Some(level) if level <= 3 => CompressionType::Fast,
                Some(level) if level >= 7 => CompressionType::Best,
                _ => CompressionType::Default,
            };
            let rgba = img.to_rgba8();
            let encoder = PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive);
            encoder
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| CodecError::encode_failed(e.to_string()))?;
        }
        MediaFormat::Gif => {
            let rgba = img.to_rgba8();
            let mut encoder = GifEncoder::new(&mut out);
            encoder
                .encode(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| CodecError::encode_failed(e.to_string()))?;
        }
        MediaFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let encoder = webp::Encoder::from_image(&rgba)
                .map_err(|e| CodecError::encode_failed(format!("webp encoder: {e}")))?;
            let memory = if options.lossless == Some(true) {
                encoder.encode_lossless()
            } else {
                encoder.encode(quality as f32)
            };
            out = memory.to_vec();
        }
        MediaFormat::Bmp => {
            img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Bmp)
                .map_err(|e| CodecError::encode_failed(e.to_string()))?;
        }
        MediaFormat::Tiff => {
            img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Tiff)
                .map_err(|e| CodecError::encode_failed(e.to_string()))?;
        }
        MediaFormat::Mp4 | MediaFormat::WebM => {
            return Err(CodecError::UnsupportedFormat { format: target });
        }
    }

    Ok(out)
}
