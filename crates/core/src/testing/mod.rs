//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external engine traits,
//! allowing comprehensive E2E testing of the orchestration layer without
//! real codecs or models.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediamorph_core::testing::MockEngine;
//!
//! let engine = Arc::new(MockEngine::new());
//!
//! // Fail the next two tasks, then succeed.
//! engine.fail_times(2);
//!
//! // Slow tasks down to observe concurrency.
//! engine.set_task_duration(Duration::from_millis(200));
//! ```

mod mock_engine;
mod mock_transcoder;

pub use mock_engine::{MockEngine, RecordedTask};
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::convert::SourceFile;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    /// Encode a small solid-color PNG.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgba([90, 120, 150, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("in-memory PNG encode");
        bytes
    }

    /// Create a source file holding a valid PNG.
    pub fn png_file(name: &str, width: u32, height: u32) -> SourceFile {
        SourceFile::new(name, png_bytes(width, height))
    }

    /// Create a source file whose bytes match no known format signature.
    pub fn garbage_file(name: &str) -> SourceFile {
        SourceFile::new(name, b"this is not any known container".to_vec())
    }
}
