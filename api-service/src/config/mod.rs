use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: &str = "10";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    /// Overrides the database named in the URI path.
    pub database: Option<String>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Not consumed yet; reserved for token middleware.
    pub jwt_secret: Option<Secret<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// OTLP collector for trace export; spans stay local when unset.
    pub otlp_endpoint: Option<String>,
}

impl ApiConfig {
    /// Loads `.env` and reads the process environment once.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, AppError> {
        let uri = get_env(vars, "MONGO_URI", None).map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(
                "MONGO_URI is not defined in environment variables"
            ))
        })?;

        let common = core_config::Config::from_vars(vars)?;

        let timeout_secs: u64 = get_env(
            vars,
            "MONGO_CONNECT_TIMEOUT_SECS",
            Some(DEFAULT_CONNECT_TIMEOUT_SECS),
        )?
        .parse()
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "MONGO_CONNECT_TIMEOUT_SECS is not a number: {}",
                e
            ))
        })?;
        if timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MONGO_CONNECT_TIMEOUT_SECS must be greater than zero"
            )));
        }

        Ok(ApiConfig {
            common,
            mongodb: MongoConfig {
                uri,
                database: get_env(vars, "MONGO_DATABASE", None).ok(),
                connect_timeout: Duration::from_secs(timeout_secs),
            },
            auth: AuthConfig {
                jwt_secret: get_env(vars, "JWT_SECRET", None).ok().map(Secret::new),
            },
            observability: ObservabilityConfig {
                otlp_endpoint: get_env(vars, "OTLP_ENDPOINT", None).ok(),
            },
        })
    }
}

/// Empty values count as unset.
fn get_env(
    vars: &HashMap<String, String>,
    key: &str,
    default: Option<&str>,
) -> Result<String, AppError> {
    match vars.get(key).filter(|v| !v.trim().is_empty()) {
        Some(val) => Ok(val.clone()),
        None => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}
