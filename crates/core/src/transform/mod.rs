//! Pre-conversion geometric transforms.
//!
//! Currently a single transform: resizing an image before it is handed to
//! the codec pool. The batch manager applies it when an item's resize config
//! differs from the item's original dimensions.

mod resize;

pub use resize::{needs_resize, resize_image, ResizeConfig, ResizePreset, TransformError};
