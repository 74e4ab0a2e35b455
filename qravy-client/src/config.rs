//! Client configuration

use std::time::Duration;

use reqwest::Url;

use crate::{ClientError, ClientResult, HttpClient};

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Connection settings for the qravy-cloud tenant API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, without the `/api/tenant` prefix
    pub base_url: String,
    /// Bearer token carrying the caller's tenant and session scope
    pub token: Option<String>,
    /// Whole-request deadline
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Read `QRAVY_URL`, `QRAVY_TOKEN` and `QRAVY_TIMEOUT_SECS`
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup("QRAVY_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        );
        config.token = lookup("QRAVY_TOKEN").filter(|s| !s.is_empty());
        if let Some(raw) = lookup("QRAVY_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ClientError::Validation(format!("QRAVY_TIMEOUT_SECS: {raw:?} is not a number")))?;
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject settings the HTTP client would only fail on at first use
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Validation(format!("base_url {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Validation(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::Validation("timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn build_http_client(&self) -> ClientResult<HttpClient> {
        self.validate()?;
        HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_reads_url_token_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("QRAVY_URL", "https://cloud.example.com"),
            ("QRAVY_TOKEN", "tok"),
            ("QRAVY_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://cloud.example.com");
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_settings() {
        for vars in [
            [("QRAVY_URL", "localhost:8080"), ("QRAVY_TIMEOUT_SECS", "5")],
            [("QRAVY_URL", "ftp://cloud.example.com"), ("QRAVY_TIMEOUT_SECS", "5")],
            [("QRAVY_URL", DEFAULT_BASE_URL), ("QRAVY_TIMEOUT_SECS", "soon")],
            [("QRAVY_URL", DEFAULT_BASE_URL), ("QRAVY_TIMEOUT_SECS", "0")],
        ] {
            assert!(
                matches!(ClientConfig::from_lookup(lookup(&vars)), Err(ClientError::Validation(_))),
                "{vars:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_build_checks_base_url() {
        assert!(ClientConfig::new("not a url").build_http_client().is_err());
        assert!(ClientConfig::default().build_http_client().is_ok());
    }
}
