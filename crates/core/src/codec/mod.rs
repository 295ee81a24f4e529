//! Codec task contract and engine boundary.
//!
//! Defines the request/reply shapes exchanged with an execution unit, the
//! [`CodecEngine`] trait every engine implements, and the built-in
//! [`ImageEngine`] backed by the `image` and `webp` crates. Engines are
//! treated as black boxes by the rest of the core: the pool only relies on
//! the contract in this module.

mod error;
mod image_engine;
mod traits;
mod types;

pub use error::CodecError;
pub use image_engine::ImageEngine;
pub(crate) use image_engine::{decode_dynamic, encode_dynamic};
pub use traits::CodecEngine;
pub use types::{EncodeOptions, OperationKind, TaskOutput, TaskProgress, TaskReply, TaskRequest};
