//! Cloud server configuration

use crate::BoxError;

/// Cloud server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port
    pub http_port: u16,
    /// PostgreSQL connection URL (`None` in development = in-memory store)
    pub database_url: Option<String>,
    /// JWT secret for tenant authentication
    pub jwt_secret: String,
    /// Bounded audit channel capacity
    pub audit_buffer_size: usize,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Daily rolling log file directory
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let is_dev = environment == "development";

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        if database_url.is_none() && !is_dev {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        Ok(Self {
            http_port: lookup("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_url,
            jwt_secret: Self::require_secret(&lookup, "JWT_SECRET", &environment)?,
            audit_buffer_size: lookup("AUDIT_BUFFER_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(1024),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: lookup("LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_dir: lookup("LOG_DIR").filter(|s| !s.is_empty()),
            environment,
        })
    }

    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret<F>(lookup: &F, name: &str, environment: &str) -> Result<String, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let val = match lookup(name) {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, BoxError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.is_development());
        assert_eq!(config.http_port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.audit_buffer_size, 1024);
        assert_eq!(config.jwt_secret, "dev-JWT_SECRET-not-for-production");
        assert!(!config.log_json);
    }

    #[test]
    fn test_production_requires_database_and_secret() {
        assert!(load(&[("ENVIRONMENT", "production")]).is_err());
        assert!(
            load(&[
                ("ENVIRONMENT", "production"),
                ("DATABASE_URL", "postgres://localhost/qravy"),
            ])
            .is_err()
        );
        assert!(
            load(&[
                ("ENVIRONMENT", "production"),
                ("DATABASE_URL", "postgres://localhost/qravy"),
                ("JWT_SECRET", ""),
            ])
            .is_err()
        );

        let config = load(&[
            ("ENVIRONMENT", "production"),
            ("DATABASE_URL", "postgres://localhost/qravy"),
            ("JWT_SECRET", "s3cret"),
            ("HTTP_PORT", "9000"),
            ("LOG_JSON", "true"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert!(config.log_json);
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = load(&[("HTTP_PORT", "abc"), ("AUDIT_BUFFER_SIZE", "0")]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.audit_buffer_size, 1024);
    }
}
