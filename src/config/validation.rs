use crate::config::types::{Config, EngineKind, IdentityConfig, OutputConfig, PipelineConfig};
use crate::ConfigError;

const MAX_CONCURRENCY: usize = 100;
const MIN_TIMEOUT_MS: u64 = 1_000;
const MAX_TIMEOUT_MS: u64 = 300_000;
const MAX_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;
    validate_identity_config(&config.identity)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates pipeline configuration
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.timeout_ms < MIN_TIMEOUT_MS || config.timeout_ms > MAX_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be between {}ms and {}ms, got {}ms",
            MIN_TIMEOUT_MS, MAX_TIMEOUT_MS, config.timeout_ms
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.engine == EngineKind::Chrome && !cfg!(feature = "chrome") {
        return Err(ConfigError::Validation(
            "engine = \"chrome\" requires building with the `chrome` feature".to_string(),
        ));
    }

    if config.settle_grace_ms >= config.timeout_ms {
        return Err(ConfigError::Validation(format!(
            "settle-grace-ms ({}ms) must be shorter than timeout-ms ({}ms)",
            config.settle_grace_ms, config.timeout_ms
        )));
    }

    Ok(())
}

/// Validates identity configuration
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for (key, value) in [
        ("default-language", &config.default_language),
        ("alternate-language", &config.alternate_language),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
        }
        // Header values must be visible ASCII
        if !value.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
            return Err(ConfigError::Validation(format!(
                "{} contains characters not allowed in a header: '{}'",
                key, value
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.is_empty() {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
