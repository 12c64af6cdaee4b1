use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub thinking: ThinkingConfig,
    pub cache: CacheConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Step and tool-call quotas applied to every thought submission.
///
/// Held by the engine and re-read through `ThinkingEngine::reload`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkingConfig {
    /// Ceiling on the planned number of thoughts in a session.
    pub max_thoughts: u32,
    /// Step size used when a caller asks for more thoughts.
    pub thoughts_increment: u32,
    /// Session-wide tool call quota.
    pub max_tool_calls: usize,
    /// Tool call quota for a single thought.
    pub max_tool_calls_per_thought: usize,
}

/// Tool-call cache manager configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    pub cache_size: usize,
    /// Call quota tracked by the manager, independent of cache size.
    pub max_calls: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/thinking.db".to_string()),
            ),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let cache = CacheConfig {
            cache_size: parse_var("TOOL_CACHE_SIZE").unwrap_or(50),
            max_calls: parse_var("TOOL_CACHE_MAX_CALLS").unwrap_or(100),
        };
        cache.validate()?;

        Ok(Config {
            database,
            logging,
            thinking: ThinkingConfig::from_env()?,
            cache,
        })
    }
}

impl ThinkingConfig {
    /// Read the thinking quotas from the environment.
    ///
    /// Does not touch `.env`; callers that want it loaded go through
    /// [`Config::from_env`] first.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let config = Self {
            max_thoughts: parse_var("MAX_THOUGHTS").unwrap_or(defaults.max_thoughts),
            thoughts_increment: parse_var("THOUGHTS_INCREMENT")
                .unwrap_or(defaults.thoughts_increment),
            max_tool_calls: parse_var("MAX_TOOL_CALLS").unwrap_or(defaults.max_tool_calls),
            max_tool_calls_per_thought: parse_var("MAX_TOOL_CALLS_PER_THOUGHT")
                .unwrap_or(defaults.max_tool_calls_per_thought),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every submission fail.
    pub fn validate(&self) -> Result<(), AppError> {
        let checks = [
            ("MAX_THOUGHTS", self.max_thoughts as usize),
            ("THOUGHTS_INCREMENT", self.thoughts_increment as usize),
            ("MAX_TOOL_CALLS", self.max_tool_calls),
            ("MAX_TOOL_CALLS_PER_THOUGHT", self.max_tool_calls_per_thought),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(AppError::Config {
                    message: format!("{} must be at least 1", name),
                });
            }
        }
        Ok(())
    }
}

impl CacheConfig {
    /// Reject a zero-sized cache or call quota.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.cache_size == 0 {
            return Err(AppError::Config {
                message: "TOOL_CACHE_SIZE must be at least 1".to_string(),
            });
        }
        if self.max_calls == 0 {
            return Err(AppError::Config {
                message: "TOOL_CACHE_MAX_CALLS must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            max_thoughts: 50,
            thoughts_increment: 10,
            max_tool_calls: 100,
            max_tool_calls_per_thought: 10,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_size: 50,
            max_calls: 100,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thinking_config_defaults() {
        let config = ThinkingConfig::default();
        assert_eq!(config.max_thoughts, 50);
        assert_eq!(config.thoughts_increment, 10);
        assert_eq!(config.max_tool_calls, 100);
        assert_eq!(config.max_tool_calls_per_thought, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thinking_config_rejects_zero_limits() {
        let config = ThinkingConfig {
            max_tool_calls_per_thought: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_TOOL_CALLS_PER_THOUGHT"));
    }

    #[test]
    fn test_cache_config_rejects_zero_size() {
        let config = CacheConfig {
            cache_size: 0,
            max_calls: 10,
        };
        assert!(config.validate().is_err());
    }
}
