//! Process configuration read from the environment.
//!
//! Binaries load `.env` with `dotenvy` before calling [`AppConfig::from_env`].

use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

pub use loomworks_observability::LogFormat;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_GST_RATE: f64 = 12.0;
const DEV_JWT_SECRET: &str = "loomworks-dev-secret-change-me";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} is not valid: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    /// Percent applied when a product is created without a rate.
    pub default_gst_rate: f64,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same rules as [`AppConfig::from_env`] over an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("LOOMWORKS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            key: "LOOMWORKS_BIND",
            message: format!("{bind_raw}: {e}"),
        })?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let use_persistent_stores = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                message: format!("expected true/false, got '{raw}'"),
            })?,
            None => false,
        };

        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let default_gst_rate = match get("DEFAULT_GST_RATE") {
            Some(raw) => {
                let rate: f64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "DEFAULT_GST_RATE",
                    message: format!("'{raw}' is not a number"),
                })?;
                if !(0.0..=100.0).contains(&rate) {
                    return Err(ConfigError::Invalid {
                        key: "DEFAULT_GST_RATE",
                        message: format!("{rate} is outside 0..=100"),
                    });
                }
                rate
            }
            None => DEFAULT_GST_RATE,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|e: loomworks_observability::UnknownLogFormat| {
                ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    message: e.to_string(),
                }
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind,
            jwt_secret,
            use_persistent_stores,
            database_url,
            default_gst_rate,
            log_format,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind.to_string(), DEFAULT_BIND);
        assert_eq!(c.jwt_secret, DEV_JWT_SECRET);
        assert!(!c.use_persistent_stores);
        assert_eq!(c.default_gst_rate, 12.0);
        assert_eq!(c.log_format, LogFormat::Json);
    }

    #[test]
    fn persistent_stores_need_a_database() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        let c = config(&[
            ("USE_PERSISTENT_STORES", "yes"),
            ("DATABASE_URL", "postgres://localhost/loomworks"),
        ])
        .unwrap();
        assert!(c.use_persistent_stores);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[("DEFAULT_GST_RATE", "120")]),
            Err(ConfigError::Invalid { key: "DEFAULT_GST_RATE", .. })
        ));
        assert!(matches!(
            config(&[("LOOMWORKS_BIND", "localhost")]),
            Err(ConfigError::Invalid { key: "LOOMWORKS_BIND", .. })
        ));
        assert!(matches!(
            config(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { key: "LOG_FORMAT", .. })
        ));
        assert!(matches!(
            config(&[("USE_PERSISTENT_STORES", "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn pretty_logs_and_custom_rate() {
        let c = config(&[("LOG_FORMAT", "Pretty"), ("DEFAULT_GST_RATE", "5")]).unwrap();
        assert_eq!(c.log_format, LogFormat::Pretty);
        assert_eq!(c.default_gst_rate, 5.0);
    }
}
