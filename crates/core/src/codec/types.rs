//! Types for the codec task contract.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::{Dimensions, MediaFormat};

/// Operation kinds an execution unit can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Decode a container payload into raw RGBA8 pixels.
    Decode,
    /// Encode raw RGBA8 pixels into the target container.
    Encode,
    /// Full decode-then-encode between containers.
    Convert,
}

/// Per-format encoding knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Quality for lossy targets (1-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Request lossless encoding where the target supports it (WebP).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lossless: Option<bool>,
    /// Compression level for lossless targets (PNG).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u8>,
    /// Pixel dimensions of a raw payload. Required for `Encode` operations,
    /// ignored otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_dimensions: Option<Dimensions>,
}

impl EncodeOptions {
    /// Sets the quality knob.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Requests lossless encoding.
    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = Some(lossless);
        self
    }
}

/// A request handed to an execution unit.
///
/// The payload buffer moves with the request: once a request is submitted the
/// caller no longer holds the bytes. This makes the ownership-transferring
/// handoff of the task contract explicit in the type system.
#[derive(Debug)]
pub struct TaskRequest {
    /// Unique task id, used to correlate the unit's replies.
    pub task_id: Uuid,
    /// What the unit should do with the payload.
    pub operation: OperationKind,
    /// Source bytes. Owned by the request.
    pub payload: Vec<u8>,
    /// Detected format of the payload.
    pub source_format: MediaFormat,
    /// Target format for `Encode` and `Convert` operations.
    pub target_format: Option<MediaFormat>,
    /// Encoding knobs.
    pub options: EncodeOptions,
}

impl TaskRequest {
    /// Builds a `Convert` request with a fresh task id.
    pub fn convert(
        payload: Vec<u8>,
        source_format: MediaFormat,
        target_format: MediaFormat,
        options: EncodeOptions,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            operation: OperationKind::Convert,
            payload,
            source_format,
            target_format: Some(target_format),
            options,
        }
    }

    /// Builds a `Decode` request with a fresh task id.
    pub fn decode(payload: Vec<u8>, source_format: MediaFormat) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            operation: OperationKind::Decode,
            payload,
            source_format,
            target_format: None,
            options: EncodeOptions::default(),
        }
    }

    /// Builds an `Encode` request for raw RGBA8 pixels with a fresh task id.
    pub fn encode(
        payload: Vec<u8>,
        dimensions: Dimensions,
        target_format: MediaFormat,
        options: EncodeOptions,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            operation: OperationKind::Encode,
            payload,
            // Raw pixels have no container; record the eventual target so the
            // request still names a concrete source for logging.
            source_format: target_format,
            target_format: Some(target_format),
            options: EncodeOptions {
                raw_dimensions: Some(dimensions),
                ..options
            },
        }
    }
}

/// Successful output of a task.
#[derive(Debug)]
pub struct TaskOutput {
    /// Result bytes.
    pub payload: Vec<u8>,
    /// Pixel dimensions of the result, when the operation produced them.
    pub dimensions: Option<Dimensions>,
}

/// A progress tick emitted by an execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Progress percentage (0-100).
    pub percent: u8,
    /// Stage label, e.g. "decode" or "encode". Forwarded verbatim.
    pub stage: String,
}

/// A reply from an execution unit to the pool.
#[derive(Debug)]
pub enum TaskReply {
    /// Task finished successfully.
    Success {
        task_id: Uuid,
        payload: Vec<u8>,
        dimensions: Option<Dimensions>,
    },
    /// Task failed.
    Error { task_id: Uuid, message: String },
    /// Intermediate progress tick.
    Progress {
        task_id: Uuid,
        percent: u8,
        stage: String,
    },
}

impl TaskReply {
    /// The task id this reply belongs to.
    pub fn task_id(&self) -> Uuid {
        match self {
            Self::Success { task_id, .. }
            | Self::Error { task_id, .. }
            | Self::Progress { task_id, .. } => *task_id,
        }
    }
}
