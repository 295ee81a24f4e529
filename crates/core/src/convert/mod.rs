//! Conversion service.
//!
//! A synchronous-looking async API over the worker pool: one call turns an
//! in-memory file plus a target format into a [`ConversionResult`]. Batch
//! helpers provide thin sequential and fire-all-at-once parallel variants;
//! resilient per-item handling lives a layer up in the batch manager.

mod error;
mod service;
mod types;

pub use error::ConvertError;
pub use service::ConversionService;
pub use types::{BatchProgress, ConversionResult, SourceFile};
