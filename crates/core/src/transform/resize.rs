//! Image resizing with Lanczos resampling.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::codec::{self, CodecError, EncodeOptions};
use crate::media::{Dimensions, MediaFormat};

/// Re-encode quality for resized intermediates. High enough that the second
/// compression pass in the codec stage stays the dominant quality factor.
const RESIZE_QUALITY: u8 = 95;

/// Named size presets. Presets bound the longest edge; `Original` keeps the
/// source dimensions and `Custom` uses the config's explicit width/height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePreset {
    /// Keep the source dimensions.
    Original,
    /// Longest edge 640px.
    Small,
    /// Longest edge 1280px.
    Medium,
    /// Longest edge 1920px.
    Large,
    /// Explicit width/height from the config.
    Custom,
}

impl ResizePreset {
    /// Longest-edge bound for this preset, if it has one.
    pub fn max_edge(&self) -> Option<u32> {
        match self {
            Self::Original | Self::Custom => None,
            Self::Small => Some(640),
            Self::Medium => Some(1280),
            Self::Large => Some(1920),
        }
    }
}

/// A pre-conversion resize specification attached to a batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Size preset.
    pub preset: ResizePreset,
    /// Target width in pixels (used by `Custom`).
    pub width: u32,
    /// Target height in pixels (used by `Custom`).
    pub height: u32,
    /// Fit within the target box preserving aspect ratio instead of
    /// stretching to it exactly.
    pub maintain_aspect_ratio: bool,
    /// Target DPI metadata. Carried through the config; raster output is
    /// unaffected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
}

impl ResizeConfig {
    /// A config that keeps the source dimensions.
    pub fn original(dimensions: Dimensions) -> Self {
        Self {
            preset: ResizePreset::Original,
            width: dimensions.width,
            height: dimensions.height,
            maintain_aspect_ratio: true,
            dpi: None,
        }
    }

    /// A custom config with explicit target dimensions.
    pub fn custom(width: u32, height: u32, maintain_aspect_ratio: bool) -> Self {
        Self {
            preset: ResizePreset::Custom,
            width,
            height,
            maintain_aspect_ratio,
            dpi: None,
        }
    }

    /// Target box for a source of the given dimensions.
    pub fn target_box(&self, source: Dimensions) -> Dimensions {
        match self.preset.max_edge() {
            Some(edge) => Dimensions {
                width: edge.min(source.width.max(1)).max(1),
                height: edge.min(source.height.max(1)).max(1),
            },
            None => match self.preset {
                ResizePreset::Original => source,
                _ => Dimensions {
                    width: self.width.max(1),
                    height: self.height.max(1),
                },
            },
        }
    }
}

/// Errors from the resize transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The source format cannot be resized.
    #[error("Format {format:?} is not resizable")]
    UnsupportedFormat { format: MediaFormat },

    /// Decoding or re-encoding the image failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Whether applying `config` to a source of `original` dimensions would
/// actually change anything.
pub fn needs_resize(config: &ResizeConfig, original: Dimensions) -> bool {
    if config.preset == ResizePreset::Original {
        return false;
    }
    let target = config.target_box(original);
    match config.preset.max_edge() {
        // Edge-bound presets only ever shrink.
        Some(edge) => original.width > edge || original.height > edge,
        None => target != original,
    }
}

/// Resizes an image buffer, re-encoding it in its source format.
///
/// With `maintain_aspect_ratio` the image is fitted within the target box
/// (never upscaled beyond it on either axis); otherwise it is stretched to
/// the exact target dimensions. Lanczos3 resampling in both cases. This is
/// CPU-bound work, so callers on the async path wrap it in `spawn_blocking`.
pub fn resize_image(
    data: &[u8],
    format: MediaFormat,
    config: &ResizeConfig,
) -> Result<Vec<u8>, TransformError> {
    if !format.is_image() {
        return Err(TransformError::UnsupportedFormat { format });
    }

    let img = codec::decode_dynamic(data, format)?;
    let source = Dimensions {
        width: img.width(),
        height: img.height(),
    };
    let target = config.target_box(source);

    let resized = if config.maintain_aspect_ratio {
        img.resize(target.width, target.height, FilterType::Lanczos3)
    } else {
        img.resize_exact(target.width, target.height, FilterType::Lanczos3)
    };

    debug!(
        "Resized {}x{} -> {}x{} ({:?})",
        source.width,
        source.height,
        resized.width(),
        resized.height(),
        config.preset
    );

    let options = EncodeOptions::default().with_quality(RESIZE_QUALITY);
    Ok(codec::encode_dynamic(&resized, format, &options)?)
}
