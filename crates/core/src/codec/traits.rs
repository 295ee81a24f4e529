//! Trait definitions for the codec module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::CodecError;
use super::types::{TaskOutput, TaskProgress, TaskRequest};

/// A codec engine that performs decode/encode/convert work.
///
/// Each execution unit in the worker pool drives one engine call at a time;
/// the engine itself may be shared between units and must therefore be
/// `Send + Sync`. Implementations are black boxes to the orchestration layer.
#[async_trait]
pub trait CodecEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Validates that the engine is ready to accept work.
    ///
    /// The pool calls this once per execution unit during startup; a failure
    /// aborts pool initialization.
    async fn validate(&self) -> Result<(), CodecError>;

    /// Runs one task to completion.
    ///
    /// Progress ticks are best-effort: if the sender is dropped or full the
    /// engine continues without reporting. The request's payload is consumed
    /// by the call.
    async fn run(
        &self,
        request: TaskRequest,
        progress: Option<mpsc::Sender<TaskProgress>>,
    ) -> Result<TaskOutput, CodecError>;
}
