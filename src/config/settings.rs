//! Application settings loaded from environment variables.

use std::{env, fmt, str::FromStr};

use jsonwebtoken::Algorithm;

use super::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_CORS_HEADERS,
    DEFAULT_CORS_METHODS, DEFAULT_CORS_ORIGINS, DEFAULT_DATABASE_URL, DEFAULT_JWT_ALGORITHM,
    DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL, DEFAULT_MAX_HISTORICAL_DAYS, DEFAULT_MAX_PORTFOLIO_SIZE,
    DEFAULT_REDIS_URL, DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, DEMO_API_KEY, DEV_SECRET_KEY, MIN_SECRET_KEY_LENGTH,
    PRODUCTION_ACCESS_TOKEN_EXPIRE_MINUTES, RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_SECONDS,
};
use crate::errors::{AppError, AppResult};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
    Testing,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Testing => "testing",
        }
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            "testing" => Ok(Environment::Testing),
            other => Err(AppError::Configuration(format!(
                "ENVIRONMENT must be one of development, staging, production, testing (got '{}')",
                other
            ))),
        }
    }
}

/// Cross-origin settings applied to the HTTP router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsSettings {
    pub origins: Vec<String>,
    pub allow_credentials: bool,
    pub methods: Vec<String>,
    pub headers: Vec<String>,
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    pub debug: bool,
    secret_key: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub database_url: String,
    pub redis_url: String,
    pub cache_ttl: u64,
    alpha_vantage_api_key: String,
    pub yahoo_finance_enabled: bool,
    pub coingecko_enabled: bool,
    pub cors: CorsSettings,
    pub rate_limit_requests: u64,
    pub rate_limit_window: u64,
    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`
    pub trust_proxy_headers: bool,
    pub log_level: String,
    pub log_file: Option<String>,
    pub max_portfolio_size: u64,
    pub max_historical_days: u32,
    pub server_host: String,
    pub server_port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("debug", &self.debug)
            .field("secret_key", &"[REDACTED]")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("cache_ttl", &self.cache_ttl)
            .field("alpha_vantage_api_key", &"[REDACTED]")
            .field("yahoo_finance_enabled", &self.yahoo_finance_enabled)
            .field("coingecko_enabled", &self.coingecko_enabled)
            .field("cors", &self.cors)
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("max_portfolio_size", &self.max_portfolio_size)
            .field("max_historical_days", &self.max_historical_days)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment (after reading `.env`).
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Every value is validated; the first invalid one is reported as
    /// [`AppError::Configuration`].
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };
        let production = environment == Environment::Production;

        let secret_key = match get("SECRET_KEY") {
            Some(key) => key,
            None if !production => {
                tracing::warn!("SECRET_KEY not set, using insecure default for development");
                DEV_SECRET_KEY.to_string()
            }
            None => {
                return Err(AppError::Configuration(
                    "SECRET_KEY must be set in production".to_string(),
                ))
            }
        };
        if secret_key.len() < MIN_SECRET_KEY_LENGTH {
            return Err(AppError::Configuration(format!(
                "SECRET_KEY must be at least {} characters long",
                MIN_SECRET_KEY_LENGTH
            )));
        }
        if production && secret_key == DEV_SECRET_KEY {
            return Err(AppError::Configuration(
                "SECRET_KEY must be changed in production".to_string(),
            ));
        }

        let algorithm_name = get("ALGORITHM").unwrap_or_else(|| DEFAULT_JWT_ALGORITHM.to_string());
        let jwt_algorithm = match algorithm_name.to_uppercase().as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(AppError::Configuration(format!(
                    "ALGORITHM must be HS256, HS384 or HS512 (got '{}')",
                    other
                )))
            }
        };

        let default_access_minutes = if production {
            PRODUCTION_ACCESS_TOKEN_EXPIRE_MINUTES
        } else {
            DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES
        };
        let access_token_expire_minutes =
            parse_positive(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", default_access_minutes)?;
        let refresh_token_expire_days = parse_positive(
            &get,
            "REFRESH_TOKEN_EXPIRE_DAYS",
            DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
        )?;

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        if !(database_url.starts_with("postgresql://") || database_url.starts_with("postgres://")) {
            return Err(AppError::Configuration(
                "DATABASE_URL must be a PostgreSQL URL".to_string(),
            ));
        }

        let redis_url = get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        if !(redis_url.starts_with("redis://") || redis_url.starts_with("rediss://")) {
            return Err(AppError::Configuration(
                "REDIS_URL must start with redis:// or rediss://".to_string(),
            ));
        }

        let cors = CorsSettings {
            origins: split_list(&get("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())),
            allow_credentials: parse_bool(&get, "CORS_ALLOW_CREDENTIALS", true)?,
            methods: split_list(&get("CORS_ALLOW_METHODS").unwrap_or_else(|| DEFAULT_CORS_METHODS.to_string())),
            headers: split_list(&get("CORS_ALLOW_HEADERS").unwrap_or_else(|| DEFAULT_CORS_HEADERS.to_string())),
        };

        // LOG_FILE="" disables the file layer, so the raw lookup is used here.
        let log_file = match lookup("LOG_FILE") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value),
            None => Some(DEFAULT_LOG_FILE.to_string()),
        };

        Ok(Self {
            environment,
            debug: parse_bool(&get, "DEBUG", false)?,
            secret_key,
            jwt_algorithm,
            access_token_expire_minutes,
            refresh_token_expire_days,
            database_url,
            redis_url,
            cache_ttl: parse_positive(&get, "CACHE_TTL", DEFAULT_CACHE_TTL_SECONDS)?,
            alpha_vantage_api_key: get("ALPHA_VANTAGE_API_KEY")
                .unwrap_or_else(|| DEMO_API_KEY.to_string()),
            yahoo_finance_enabled: parse_bool(&get, "YAHOO_FINANCE_ENABLED", true)?,
            coingecko_enabled: parse_bool(&get, "COINGECKO_ENABLED", true)?,
            cors,
            rate_limit_requests: parse_positive(&get, "RATE_LIMIT_REQUESTS", RATE_LIMIT_REQUESTS)?,
            rate_limit_window: parse_positive(&get, "RATE_LIMIT_WINDOW", RATE_LIMIT_WINDOW_SECONDS)?,
            trust_proxy_headers: parse_bool(&get, "TRUST_PROXY_HEADERS", false)?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_file,
            max_portfolio_size: parse_positive(&get, "MAX_PORTFOLIO_SIZE", DEFAULT_MAX_PORTFOLIO_SIZE)?,
            max_historical_days: parse_positive(&get, "MAX_HISTORICAL_DAYS", DEFAULT_MAX_HISTORICAL_DAYS)?,
            server_host: get("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_positive(&get, "SERVER_PORT", DEFAULT_SERVER_PORT)?,
        })
    }

    /// Get secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }

    /// Alpha Vantage key, or `None` while the demo key is configured.
    pub fn alpha_vantage_key(&self) -> Option<&str> {
        if self.alpha_vantage_api_key == DEMO_API_KEY {
            None
        } else {
            Some(&self.alpha_vantage_api_key)
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> AppResult<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Configuration(format!(
                "{} must be a boolean (got '{}')",
                key, value
            ))),
        },
    }
}

fn parse_positive<G, T>(get: &G, key: &str, default: T) -> AppResult<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default,
{
    match get(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(AppError::Configuration(format!(
                "{} must be a positive number (got '{}')",
                key, value
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> AppResult<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.access_token_expire_minutes, 30);
        assert_eq!(config.refresh_token_expire_days, 7);
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.log_file.as_deref(), Some("insightfinance.log"));
        assert!(config.alpha_vantage_key().is_none());
        assert_eq!(
            config.cors.origins,
            vec!["http://localhost:3000", "http://localhost:8080"]
        );
        assert_eq!(config.jwt_algorithm, Algorithm::HS256);
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn test_production_requires_secret_key() {
        let result = config_with(&[("ENVIRONMENT", "production")]);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_production_rejects_dev_secret() {
        let result = config_with(&[("ENVIRONMENT", "production"), ("SECRET_KEY", DEV_SECRET_KEY)]);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_production_shortens_access_tokens() {
        let config = config_with(&[
            ("ENVIRONMENT", "production"),
            ("SECRET_KEY", "a-production-secret-that-is-long-enough"),
        ])
        .unwrap();
        assert_eq!(config.access_token_expire_minutes, 15);
        assert!(config.is_production());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = config_with(&[("SECRET_KEY", "short")]);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_with(&[("ENVIRONMENT", "qa")]).is_err());
        assert!(config_with(&[("ALGORITHM", "RS256")]).is_err());
        assert!(config_with(&[("DATABASE_URL", "mysql://localhost/db")]).is_err());
        assert!(config_with(&[("REDIS_URL", "http://localhost")]).is_err());
        assert!(config_with(&[("DEBUG", "maybe")]).is_err());
        assert!(config_with(&[("RATE_LIMIT_REQUESTS", "0")]).is_err());
        assert!(config_with(&[("SERVER_PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_empty_log_file_disables_file_logging() {
        let config = config_with(&[("LOG_FILE", "")]).unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_alpha_vantage_key_exposed_when_not_demo() {
        let config = config_with(&[("ALPHA_VANTAGE_API_KEY", "real-key")]).unwrap();
        assert_eq!(config.alpha_vantage_key(), Some("real-key"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_with(&[("ALPHA_VANTAGE_API_KEY", "real-key")]).unwrap();
        let output = format!("{:?}", config);
        assert!(!output.contains("real-key"));
        assert!(!output.contains(DEV_SECRET_KEY));
        assert!(!output.contains("password@localhost"));
    }
}
