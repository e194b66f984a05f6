use crate::{env_parse_or, env_required, ConfigError, FromEnv};
use std::time::Duration;

/// Identity provider and identity cache configuration
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    /// Base URL of the GoTrue-compatible identity endpoint (without `/user`)
    pub url: String,
    /// How long a resolved profile may be served from the cache
    pub cache_ttl_secs: u64,
    /// How often expired cache entries are swept
    pub sweep_interval_secs: u64,
    /// Timeout for a single provider lookup
    pub request_timeout_secs: u64,
}

impl IdentityConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9999".to_string(),
            cache_ttl_secs: 300,
            sweep_interval_secs: 60,
            request_timeout_secs: 10,
        }
    }
}

impl FromEnv for IdentityConfig {
    /// Reads:
    /// - IDENTITY_URL (required)
    /// - IDENTITY_CACHE_TTL_SECS: defaults to 300
    /// - IDENTITY_CACHE_SWEEP_SECS: defaults to 60
    /// - IDENTITY_TIMEOUT_SECS: defaults to 10
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_required("IDENTITY_URL")?
            .trim_end_matches('/')
            .to_string();
        let cache_ttl_secs = env_parse_or("IDENTITY_CACHE_TTL_SECS", 300)?;
        let sweep_interval_secs = env_parse_or("IDENTITY_CACHE_SWEEP_SECS", 60)?;
        let request_timeout_secs = env_parse_or("IDENTITY_TIMEOUT_SECS", 10)?;

        if sweep_interval_secs == 0 {
            return Err(ConfigError::ParseError {
                key: "IDENTITY_CACHE_SWEEP_SECS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            url,
            cache_ttl_secs,
            sweep_interval_secs,
            request_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_config_from_env_with_defaults() {
        temp_env::with_vars(
            [
                ("IDENTITY_URL", Some("https://tracker.example.com/.netlify/identity/")),
                ("IDENTITY_CACHE_TTL_SECS", None),
                ("IDENTITY_CACHE_SWEEP_SECS", None),
                ("IDENTITY_TIMEOUT_SECS", None),
            ],
            || {
                let config = IdentityConfig::from_env().unwrap();
                assert_eq!(config.url, "https://tracker.example.com/.netlify/identity");
                assert_eq!(config.cache_ttl(), Duration::from_secs(300));
                assert_eq!(config.sweep_interval(), Duration::from_secs(60));
                assert_eq!(config.request_timeout(), Duration::from_secs(10));
            },
        );
    }

    #[test]
    fn test_identity_config_custom_cache_timings() {
        temp_env::with_vars(
            [
                ("IDENTITY_URL", Some("http://localhost:9999")),
                ("IDENTITY_CACHE_TTL_SECS", Some("30")),
                ("IDENTITY_CACHE_SWEEP_SECS", Some("5")),
            ],
            || {
                let config = IdentityConfig::from_env().unwrap();
                assert_eq!(config.cache_ttl_secs, 30);
                assert_eq!(config.sweep_interval_secs, 5);
            },
        );
    }

    #[test]
    fn test_identity_config_missing_url() {
        temp_env::with_var_unset("IDENTITY_URL", || {
            let err = IdentityConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("IDENTITY_URL"));
        });
    }

    #[test]
    fn test_identity_config_rejects_zero_sweep() {
        temp_env::with_vars(
            [
                ("IDENTITY_URL", Some("http://localhost:9999")),
                ("IDENTITY_CACHE_SWEEP_SECS", Some("0")),
            ],
            || {
                let err = IdentityConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("IDENTITY_CACHE_SWEEP_SECS"));
            },
        );
    }

    #[test]
    fn test_identity_config_new_uses_default_timings() {
        let config = IdentityConfig::new("http://identity.local");
        assert_eq!(config.url, "http://identity.local");
        assert_eq!(config.cache_ttl_secs, 5 * config.sweep_interval_secs);
    }
}
