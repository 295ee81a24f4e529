use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::cutout::CutoutConfig;
use crate::pool::PoolConfig;

/// Top-level configuration, one section per component.
///
/// Every section has sensible defaults; an empty file is a valid
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Batch manager settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Background-removal model settings.
    #[serde(default)]
    pub cutout: CutoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            batch: BatchConfig::default(),
            cutout: CutoutConfig::default(),
        }
    }
}
