//! Connection helpers for the stores the notification service uses
//!
//! # Features
//!
//! - `redis` (default) - Redis `ConnectionManager` with startup retry
//! - `config` - `core_config::FromEnv` for `RedisConfig`
//!
//! ```ignore
//! use database::redis::{connect_from_config_with_retry, RedisConfig};
//! use core_config::FromEnv;
//!
//! let config = RedisConfig::from_env()?;
//! let manager = connect_from_config_with_retry(&config, None).await?;
//! ```

pub mod common;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};
