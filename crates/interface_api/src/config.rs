//! API configuration

use core_kernel::Timezone;
use serde::Deserialize;

/// API configuration
///
/// Read from `API_*` environment variables (`API_PORT`, `API_JWT_SECRET`,
/// `API_BUSINESS_TIMEZONE`, ...); unset fields keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// IANA zone whose calendar dates the generated files
    pub business_timezone: Timezone,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/cobranca".to_string(),
            log_level: "info".to_string(),
            business_timezone: Timezone::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.business_timezone, Timezone::default());
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: ApiConfig = config::Config::builder()
            .set_override("port", "9090")
            .unwrap()
            .set_override("business_timezone", "America/Manaus")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.business_timezone.0, chrono_tz::America::Manaus);
        assert_eq!(config.jwt_expiration_secs, 3600);
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let result = config::Config::builder()
            .set_override("business_timezone", "Mars/Olympus_Mons")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<ApiConfig>();
        assert!(result.is_err());
    }
}
