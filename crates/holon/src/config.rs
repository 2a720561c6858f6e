//! Process-wide configuration, read once at startup and passed down by
//! dependency injection rather than an ambient global lookup inside the
//! core. `HOLON_DB_HOST`/`PORT`/`USER`/`PASSWORD` are accepted for
//! interface parity with a future networked backend but are not consulted
//! by the `rusqlite` adapter.

use holon_core::CoreError;

const DEFAULT_DB_PATH: &str = "./holon.db";
const DEFAULT_POOL_SIZE: usize = 10;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub pool_size: usize,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        let db_path = std::env::var("HOLON_DB_PATH")
            .or_else(|_| std::env::var("HOLON_DB_NAME"))
            .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let pool_size = match std::env::var("HOLON_DB_POOL_SIZE") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| CoreError::validation(format!("HOLON_DB_POOL_SIZE is not a valid integer: {raw}")))?,
            Err(_) => DEFAULT_POOL_SIZE,
        };

        if pool_size == 0 {
            return Err(CoreError::validation("HOLON_DB_POOL_SIZE must be at least 1"));
        }

        let log_filter =
            std::env::var("HOLON_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            db_path,
            pool_size,
            log_filter,
        })
    }

    /// Build a config pointing at an in-memory database, for tests.
    pub fn in_memory() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_config_has_sane_defaults() {
        let cfg = Config::in_memory();
        assert_eq!(cfg.db_path, ":memory:");
        assert!(cfg.pool_size > 0);
    }

    #[test]
    fn rejects_non_numeric_pool_size() {
        std::env::set_var("HOLON_DB_POOL_SIZE", "not-a-number");
        let result = Config::from_env();
        std::env::remove_var("HOLON_DB_POOL_SIZE");
        assert!(result.is_err());
    }
}
