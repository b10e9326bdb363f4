use crate::config::types::{FetchConfig, PipelineConfig, ProbeConfig};
use crate::ConfigError;
use reqwest::header::HeaderValue;

/// Upper bound on simultaneous fetches
const MAX_CONCURRENCY: usize = 1024;

/// Upper bound on retries per URL
const MAX_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &ProbeConfig) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_pipeline_config(&config.pipeline)?;
    Ok(())
}

/// Validates request headers and timeouts
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    validate_header("user-agent", &config.user_agent)?;
    validate_header("accept", &config.accept)?;
    validate_header("accept-language", &config.accept_language)?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs ({}) cannot exceed timeout-secs ({})",
            config.connect_timeout_secs, config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates concurrency and retry settings
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.max_concurrent_fetches
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    Ok(())
}

/// A header must be non-empty and encodable as an HTTP header value
fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() || HeaderValue::from_str(value).is_err() {
        return Err(ConfigError::InvalidHeader {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
