//! Background-removal model boundary.
//!
//! The segmentation model is an external collaborator: the core only needs
//! its initialize/process contract. Batch processing uses settle-all
//! semantics: inputs that fail are logged and dropped from the successful
//! results, never reported per input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::convert::SourceFile;

/// Compute device preference for model inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// Pick GPU when the platform supports it, otherwise CPU.
    #[default]
    Auto,
    /// Force CPU inference.
    Cpu,
    /// Force GPU inference.
    Gpu,
}

/// Configuration for model initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoutConfig {
    /// Device preference. Resolution is platform-conditional and happens in
    /// `initialize`.
    #[serde(default)]
    pub device: DevicePreference,
    /// Model identifier to load.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "isnet".to_string()
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            device: DevicePreference::default(),
            model: default_model(),
        }
    }
}

/// Errors reported by a background remover.
#[derive(Debug, Error)]
pub enum CutoutError {
    /// Model/device initialization failed.
    #[error("Model initialization failed: {reason}")]
    InitFailed { reason: String },

    /// Inference on one input failed.
    #[error("Inference failed: {reason}")]
    InferenceFailed { reason: String },

    /// The input is not an image the model can process.
    #[error("Unsupported input: {reason}")]
    UnsupportedInput { reason: String },
}

impl CutoutError {
    /// Creates a new inference failed error.
    pub fn inference_failed(reason: impl Into<String>) -> Self {
        Self::InferenceFailed {
            reason: reason.into(),
        }
    }
}

/// A background-removal model.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Loads the model and selects a device. Must be called before
    /// processing.
    async fn initialize(&self) -> Result<(), CutoutError>;

    /// Removes the background from one image, returning the result file.
    async fn remove_background(&self, file: &SourceFile) -> Result<SourceFile, CutoutError>;
}

/// Removes backgrounds from many images in parallel with settle-all
/// semantics: every input is attempted, failures are logged and silently
/// dropped from the returned list.
pub async fn remove_many(
    remover: &dyn BackgroundRemover,
    files: &[SourceFile],
) -> Vec<SourceFile> {
    let attempts = files.iter().map(|file| remover.remove_background(file));
    let settled = futures::future::join_all(attempts).await;

    settled
        .into_iter()
        .zip(files)
        .filter_map(|(outcome, file)| match outcome {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Background removal failed for '{}': {}", file.name, e);
                None
            }
        })
        .collect()
}
