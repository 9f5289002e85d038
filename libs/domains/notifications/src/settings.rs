use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use std::time::Duration;

/// Dispatch limits and link settings, read once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub dedup_ttl: Duration,
    pub rate_limit_max_requests: u64,
    pub rate_limit_window_seconds: u64,
    /// Send attempts per notification before it is marked failed
    pub max_retries: u32,
    pub app_base_url: String,
    pub company_name: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            dedup_ttl: Duration::from_secs(86_400),
            rate_limit_max_requests: 100,
            rate_limit_window_seconds: 3_600,
            max_retries: 3,
            app_base_url: "https://hrms.example.com".to_string(),
            company_name: "HRMS".to_string(),
        }
    }
}

impl FromEnv for DispatchSettings {
    /// Reads:
    /// - CACHE_TTL_DEDUP (seconds, default: 86400)
    /// - RATE_LIMIT_MAX_REQUESTS (default: 100)
    /// - RATE_LIMIT_WINDOW_SECONDS (default: 3600)
    /// - MAX_RETRIES (default: 3)
    /// - APP_BASE_URL (default: https://hrms.example.com)
    /// - EMAIL_SERVICE_NAME (default: HRMS)
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            dedup_ttl: Duration::from_secs(env_parse(
                "CACHE_TTL_DEDUP",
                defaults.dedup_ttl.as_secs(),
            )?),
            rate_limit_max_requests: env_parse(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            )?,
            rate_limit_window_seconds: env_parse(
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.rate_limit_window_seconds,
            )?,
            max_retries: env_parse("MAX_RETRIES", defaults.max_retries)?,
            app_base_url: env_or_default("APP_BASE_URL", &defaults.app_base_url),
            company_name: env_or_default("EMAIL_SERVICE_NAME", &defaults.company_name),
        };

        settings.validate()?;
        Ok(settings)
    }
}

impl DispatchSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("MAX_RETRIES must be at least 1".to_string()));
        }
        if self.rate_limit_window_seconds == 0 {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_WINDOW_SECONDS must be at least 1".to_string(),
            ));
        }
        if !self.app_base_url.starts_with("http://") && !self.app_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "APP_BASE_URL '{}' is not an http(s) URL",
                self.app_base_url
            )));
        }
        Ok(())
    }
}
