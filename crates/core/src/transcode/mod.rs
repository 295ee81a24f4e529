//! Video/audio transcoding engine boundary.
//!
//! The transcoding engine is an external collaborator: it is invoked with an
//! explicit command-argument list against a virtual file system it manages
//! internally, and hands back an encoded binary. This module specifies that
//! boundary (the trait, the argument builder and the progress shape) and
//! nothing of the engine's internals.

mod error;
mod traits;
mod types;

pub use error::TranscodeError;
pub use traits::TranscodeEngine;
pub use types::{TranscodeArgs, TranscodeJob, TranscodeProgress, VideoCodec};
