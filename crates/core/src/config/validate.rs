use super::{types::Config, ConfigError};
use crate::format;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Batch cap is at least 1
/// - Default format is registered
/// - Extension allow-list is not empty
/// - Engine command timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Batch validation
    if config.batch.max_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "batch.max_jobs must be at least 1".to_string(),
        ));
    }
    if let Err(e) = format::resolve(&config.batch.default_format) {
        return Err(ConfigError::ValidationError(format!(
            "batch.default_format: {}",
            e
        )));
    }
    if config
        .batch
        .allowed_extensions
        .iter()
        .all(|ext| ext.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "batch.allowed_extensions cannot be empty".to_string(),
        ));
    }

    // Engine validation
    if config.engine.exec_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.exec_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &Config, needle: &str) {
        let err = validate_config(config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains(needle)));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_invalid(&config, "server.port");
    }

    #[test]
    fn test_validate_batch_section() {
        let mut config = Config::default();
        config.batch.max_jobs = 0;
        assert_invalid(&config, "max_jobs");

        let mut config = Config::default();
        config.batch.default_format = "opus".to_string();
        assert_invalid(&config, "opus");

        let mut config = Config::default();
        config.batch.allowed_extensions = vec![" ".to_string()];
        assert_invalid(&config, "allowed_extensions");
    }

    #[test]
    fn test_validate_timeout_zero_fails() {
        let mut config = Config::default();
        config.engine.exec_timeout_secs = 0;
        assert_invalid(&config, "exec_timeout_secs");
    }
}
