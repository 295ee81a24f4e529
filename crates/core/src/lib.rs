pub mod batch;
pub mod codec;
pub mod config;
pub mod convert;
pub mod cutout;
pub mod media;
pub mod metrics;
pub mod pool;
pub mod testing;
pub mod transcode;
pub mod transform;

pub use batch::{
    BatchConfig, BatchError, BatchManager, BatchState, BatchStatistics, ItemStatus,
    ProcessingItem, SubscriptionId,
};
pub use codec::{CodecEngine, CodecError, EncodeOptions, ImageEngine, OperationKind, TaskRequest};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use convert::{ConversionResult, ConversionService, ConvertError, SourceFile};
pub use media::{Dimensions, MediaFormat};
pub use pool::{PoolConfig, PoolError, PoolStatus, TaskResult, WorkerPool};
pub use transform::{ResizeConfig, ResizePreset};
