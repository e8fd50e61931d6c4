use secrecy::Secret;
use std::fmt;

/// Runtime settings, read from the environment at startup.
#[derive(Clone)]
pub struct Settings {
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: Secret<String>,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// Requests allowed in a burst per client before throttling
    pub rate_limit_burst: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "{key} has invalid value '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        // Get allowed origins from environment (comma-separated), default to localhost
        let allowed_origins = non_empty("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(&non_empty, "DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: Secret::new(jwt_secret),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&non_empty, "PORT", 8080)?,
            allowed_origins,
            rate_limit_burst: parse_or(&non_empty, "RATE_LIMIT_BURST", 30)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_only_secret() {
        let settings = settings(&[("JWT_SECRET", "s3cret")]).expect("Should load");

        assert_eq!(settings.database_url, None);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(settings.jwt_secret.expose_secret(), "s3cret");
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        assert_eq!(
            settings(&[("PORT", "9000")]).err(),
            Some(ConfigError::Missing("JWT_SECRET"))
        );
    }

    #[test]
    fn test_invalid_port_names_the_key() {
        let err = settings(&[("JWT_SECRET", "x"), ("PORT", "eighty")]).err();
        assert_eq!(
            err,
            Some(ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string()
            })
        );
    }

    #[test]
    fn test_origins_are_split_and_trimmed() {
        let settings = settings(&[
            ("JWT_SECRET", "x"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("DATABASE_URL", "postgres://localhost/ledger"),
        ])
        .expect("Should load");

        assert_eq!(
            settings.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(
            settings.database_url.as_deref(),
            Some("postgres://localhost/ledger")
        );
    }
}
