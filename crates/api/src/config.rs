//! Application configuration loaded from environment variables.

use checkout::CartConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `CART_TTL_SECS`: how long a quoted cart stays valid (default: 24h)
/// - `CURRENCY`: cart currency code (default: `"USD"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub cart_ttl_secs: i64,
    pub currency: String,
}

const DEFAULT_CART_TTL_SECS: i64 = 24 * 60 * 60;

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            cart_ttl_secs: parse_var("CART_TTL_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.cart_ttl_secs),
            currency: std::env::var("CURRENCY").unwrap_or(defaults.currency),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cart_config(&self) -> CartConfig {
        CartConfig::default()
            .with_ttl(chrono::Duration::seconds(self.cart_ttl_secs))
            .with_currency(self.currency.clone())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 10,
            cart_ttl_secs: DEFAULT_CART_TTL_SECS,
            currency: "USD".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.cart_ttl_secs, 86_400);
        assert_eq!(config.currency, "USD");
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cart_config_uses_ttl_and_currency() {
        let config = Config {
            cart_ttl_secs: 600,
            currency: "CAD".to_string(),
            ..Config::default()
        };
        let cart = config.cart_config();
        assert_eq!(cart.ttl, chrono::Duration::minutes(10));
        assert_eq!(cart.currency, "CAD");
    }
}
