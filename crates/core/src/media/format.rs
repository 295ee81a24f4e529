//! Media container formats and magic-byte detection.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A media container format supported by the conversion core.
///
/// Image formats are handled by the codec engine directly; video containers
/// are recognized for sniffing purposes and routed to the transcoding engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFormat {
    /// JPEG / JFIF
    Jpeg,
    /// Portable Network Graphics
    Png,
    /// Graphics Interchange Format
    Gif,
    /// WebP (lossy or lossless)
    WebP,
    /// Windows Bitmap
    Bmp,
    /// Tagged Image File Format
    Tiff,
    /// MPEG-4 Part 14 container
    Mp4,
    /// WebM / Matroska (EBML)
    WebM,
}

impl MediaFormat {
    /// Detects the format of a buffer from its magic bytes.
    ///
    /// Returns `None` when no known signature matches. Detection inspects
    /// the container header only; it does not validate the full payload.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 12 {
            return Self::detect_short(bytes);
        }

        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        if bytes.starts_with(b"BM") {
            return Some(Self::Bmp);
        }
        if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
            return Some(Self::Tiff);
        }
        // MP4 family: the "ftyp" box follows a 4-byte box size.
        if &bytes[4..8] == b"ftyp" {
            return Some(Self::Mp4);
        }
        if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Some(Self::WebM);
        }

        None
    }

    /// Detection fallback for buffers shorter than the longest signature.
    fn detect_short(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if bytes.starts_with(b"BM") && bytes.len() >= 2 {
            return Some(Self::Bmp);
        }
        None
    }

    /// Resolves a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "mp4" | "m4v" => Some(Self::Mp4),
            "webm" | "mkv" => Some(Self::WebM),
            _ => None,
        }
    }

    /// Returns the canonical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Mp4 => "video/mp4",
            Self::WebM => "video/webm",
        }
    }

    /// Whether this is a still-image format the codec engine can process.
    pub fn is_image(&self) -> bool {
        !matches!(self, Self::Mp4 | Self::WebM)
    }

    /// Maps to the `image` crate format for image containers.
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Png => Some(image::ImageFormat::Png),
            Self::Gif => Some(image::ImageFormat::Gif),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Bmp => Some(image::ImageFormat::Bmp),
            Self::Tiff => Some(image::ImageFormat::Tiff),
            Self::Mp4 | Self::WebM => None,
        }
    }
}

/// Derives the output filename for a conversion: the original base name with
/// the target format's extension.
pub fn output_filename(original: &str, target: MediaFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");

    format!("{}.{}", stem, target.extension())
}
