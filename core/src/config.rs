//! Client configuration.
//!
//! Everything here is fixed at construction; the client holds no other
//! state between calls.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.pobo.space";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_TOKEN: &str = "POBO_API_TOKEN";
pub const ENV_BASE_URL: &str = "POBO_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "POBO_TIMEOUT_SECS";

/// Connection settings for `PoboClient`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    /// Overall request timeout. The connect timeout is always `CONNECT_TIMEOUT`.
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `POBO_API_TOKEN`, `POBO_BASE_URL` and `POBO_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(ENV_API_TOKEN)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_API_TOKEN))?;
        let mut config = Self::new(token);

        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(base_url.trim());
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid {
                    name: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new("token");
        assert_eq!(config.base_url, "https://api.pobo.space");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("token").with_base_url("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    #[test]
    fn debug_hides_token() {
        let config = ClientConfig::new("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn from_lookup_requires_token() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_API_TOKEN));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_API_TOKEN, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_API_TOKEN));
    }

    #[test]
    fn from_lookup_reads_all_fields() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "abc"),
            (ENV_BASE_URL, "http://example.test/"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.base_url, "http://example.test");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn from_lookup_rejects_bad_timeout() {
        for bad in ["0", "soon", "-3"] {
            let err = ClientConfig::from_lookup(lookup(&[
                (ENV_API_TOKEN, "abc"),
                (ENV_TIMEOUT_SECS, bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: ENV_TIMEOUT_SECS, .. }));
        }
    }
}
