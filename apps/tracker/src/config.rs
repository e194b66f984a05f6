use core_config::FromEnv;
use core_config::identity::IdentityConfig;
use database::mongodb::MongoConfig;

pub use core_config::Environment;

/// Tracker configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub mongodb: MongoConfig,
    pub identity: IdentityConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let mongodb = MongoConfig::from_env()?;
        let identity = IdentityConfig::from_env()?;

        Ok(Self {
            environment,
            mongodb,
            identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_composes_components() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("production")),
                ("MONGODB_URL", Some("mongodb://db:27017")),
                ("MONGODB_DATABASE", Some("achievements")),
                ("IDENTITY_URL", Some("https://id.example.com/.netlify/identity/")),
                ("IDENTITY_CACHE_TTL_SECS", Some("30")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.environment.is_production());
                assert_eq!(config.mongodb.url(), "mongodb://db:27017");
                assert_eq!(config.mongodb.database(), "achievements");
                assert_eq!(
                    config.identity.url,
                    "https://id.example.com/.netlify/identity"
                );
                assert_eq!(config.identity.cache_ttl_secs, 30);
            },
        );
    }

    #[test]
    fn test_from_env_requires_identity_url() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://db:27017")),
                ("IDENTITY_URL", None),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
