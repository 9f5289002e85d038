#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

/// Redis connection settings
///
/// Either a full `url`, or host/port/database with optional ACL credentials.
/// A full URL wins when both are given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: u8,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RedisConfig {
    /// Use a complete connection URL, e.g. `redis://127.0.0.1:6379/0`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn from_parts(host: impl Into<String>, port: u16, database: u8) -> Self {
        Self {
            url: None,
            host: host.into(),
            port,
            database,
            username: None,
            password: None,
        }
    }

    pub fn with_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Connection URL including credentials and database
    pub fn build_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (None, Some(pass)) => format!(":{}@", pass),
            (Some(user), None) => format!("{}@", user),
            (None, None) => String::new(),
        };

        format!("redis://{}{}:{}/{}", auth, self.host, self.port, self.database)
    }

    /// URL safe for logs (password replaced)
    pub fn redacted_url(&self) -> String {
        match &self.url {
            Some(url) => match (url.find("://"), url.rfind('@')) {
                (Some(scheme), Some(at)) if at > scheme => {
                    format!("{}***{}", &url[..scheme + 3], &url[at..])
                }
                _ => url.clone(),
            },
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::from_parts("localhost", 6379, 0)
    }
}

/// Environment variables:
/// - `REDIS_URL` (optional) - full connection string, overrides the rest
/// - `REDIS_HOST` (default `localhost`), `REDIS_PORT` (default 6379)
/// - `REDIS_DB` or `REDIS_DATABASE` (default 0)
/// - `REDIS_USERNAME`, `REDIS_PASSWORD` (optional; empty means unset)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let database = match non_empty("REDIS_DB") {
            Some(_) => env_parse("REDIS_DB", 0u8)?,
            None => env_parse("REDIS_DATABASE", 0u8)?,
        };

        Ok(Self {
            url: non_empty("REDIS_URL"),
            host: env_or_default("REDIS_HOST", "localhost"),
            port: env_parse("REDIS_PORT", 6379u16)?,
            database,
            username: non_empty("REDIS_USERNAME"),
            password: non_empty("REDIS_PASSWORD"),
        })
    }
}
