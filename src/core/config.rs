use crate::core::errors::ConfigError;
use std::env;
use std::time::Duration;
use tracing::Level;

/// Poll loop policy for the OCR backend
///
/// Fixed interval with a hard attempt ceiling. No exponential backoff: the
/// workload is a single small image and bounded latency matters more than
/// backend load-shedding. Kept as a policy object so tests can run the loop
/// with a zero-duration interval.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

/// OCR backend configuration
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Base URL of the OCR backend, no trailing slash
    pub endpoint: String,
    pub api_key: String,
    pub poll: PollPolicy,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrConfig,
    pub log_level: Level,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("OCR_ENDPOINT")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        let api_key = env::var("OCR_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let interval_ms = env::var("OCR_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let max_attempts = env::var("OCR_POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        Ok(Self {
            ocr: OcrConfig {
                endpoint,
                api_key,
                poll: PollPolicy {
                    interval: Duration::from_millis(interval_ms),
                    max_attempts,
                },
            },
            log_level,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ocr.poll.max_attempts == 0 {
            return Err(ConfigError::InvalidPollPolicy(
                "OCR_POLL_MAX_ATTEMPTS must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 30);
    }
}
