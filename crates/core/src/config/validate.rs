use super::{types::Config, ConfigError};

/// Maximum retry budget the batch manager accepts. A larger value is almost
/// certainly a typo and would make failing items very slow to settle.
const MAX_RETRY_BUDGET: u32 = 10;

/// Validate configuration
/// Currently validates:
/// - Pool worker count is not 0
/// - Batch retry budget stays within bounds
/// - An explicit parallelism bound is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.pool.workers == 0 {
        return Err(ConfigError::ValidationError(
            "pool.workers cannot be 0".to_string(),
        ));
    }

    if config.batch.max_retries > MAX_RETRY_BUDGET {
        return Err(ConfigError::ValidationError(format!(
            "batch.max_retries cannot exceed {MAX_RETRY_BUDGET}"
        )));
    }

    if config.batch.max_parallel_items == Some(0) {
        return Err(ConfigError::ValidationError(
            "batch.max_parallel_items cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = Config::default();
        config.pool.workers = 0;

        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_excessive_retries_fails() {
        let mut config = Config::default();
        config.batch.max_retries = 100;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_parallelism_fails() {
        let mut config = Config::default();
        config.batch.max_parallel_items = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
