//! Types for the transcoding boundary.

use serde::{Deserialize, Serialize};

/// Video codec selection for transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// VP9
    Vp9,
    /// AV1
    Av1,
    /// Copy (no re-encoding)
    Copy,
}

impl VideoCodec {
    /// Returns the engine's codec name for this selection.
    pub fn codec_name(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Vp9 => "libvpx-vp9",
            Self::Av1 => "libaom-av1",
            Self::Copy => "copy",
        }
    }
}

/// High-level transcode knobs, rendered into the engine's argument list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodeArgs {
    /// Trim start in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_start_secs: Option<f64>,
    /// Trim end in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_end_secs: Option<f64>,
    /// Constant Rate Factor (quality, lower = better).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    /// Target video bitrate in kbps (alternative to CRF).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// Maximum width (height scaled proportionally).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    /// Maximum height (width scaled proportionally).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    /// Video codec selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<VideoCodec>,
    /// Drop the audio track entirely.
    #[serde(default)]
    pub strip_audio: bool,
}

impl TranscodeArgs {
    /// Renders the knobs into an explicit command-argument list.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(start) = self.trim_start_secs {
            args.extend(["-ss".to_string(), format!("{start}")]);
        }
        if let Some(end) = self.trim_end_secs {
            args.extend(["-to".to_string(), format!("{end}")]);
        }
        if let Some(codec) = self.video_codec {
            args.extend(["-c:v".to_string(), codec.codec_name().to_string()]);
        }
        if let Some(crf) = self.crf {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }
        if let Some(bitrate) = self.bitrate_kbps {
            args.extend(["-b:v".to_string(), format!("{bitrate}k")]);
        }
        match (self.max_width, self.max_height) {
            (Some(w), Some(h)) => {
                args.extend([
                    "-vf".to_string(),
                    format!("scale='min({w},iw)':'min({h},ih)':force_original_aspect_ratio=decrease"),
                ]);
            }
            (Some(w), None) => {
                args.extend(["-vf".to_string(), format!("scale='min({w},iw)':-2")]);
            }
            (None, Some(h)) => {
                args.extend(["-vf".to_string(), format!("scale=-2:'min({h},ih)'")]);
            }
            (None, None) => {}
        }
        if self.strip_audio {
            args.push("-an".to_string());
        }

        args
    }
}

/// A transcode request against the engine's virtual file system.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Unique job id.
    pub job_id: String,
    /// Name the payload is materialized under in the engine's file system.
    pub input_name: String,
    /// Input bytes. Owned by the job.
    pub payload: Vec<u8>,
    /// Explicit command-argument list (see [`TranscodeArgs::to_args`]).
    pub args: Vec<String>,
    /// Name of the output file to read back.
    pub output_name: String,
}

/// Progress emitted by the transcoding engine: fractional completion plus
/// elapsed processing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeProgress {
    /// Completed fraction (0.0 - 1.0).
    pub fraction: f32,
    /// Processing time spent so far, in seconds.
    pub elapsed_secs: f64,
}

impl TranscodeProgress {
    /// Linear extrapolation of the remaining time:
    /// `elapsed / fraction - elapsed`. Explicitly approximate, since
    /// transcoding speed varies over the stream. `None` until progress is
    /// reported.
    pub fn estimated_remaining_secs(&self) -> Option<f64> {
        if self.fraction <= 0.0 {
            return None;
        }
        let fraction = f64::from(self.fraction.min(1.0));
        Some((self.elapsed_secs / fraction - self.elapsed_secs).max(0.0))
    }
}
