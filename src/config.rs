//! Server configuration loaded from environment variables
//!
//! | Env Var               | Default                     |
//! |-----------------------|-----------------------------|
//! | `ECOVOICE_PORT`       | `8000`                      |
//! | `ECOVOICE_DB_PATH`    | `~/.ecovoice/reports.db`    |
//! | `GOOGLE_MAPS_API_KEY` | unset: coordinates only     |
//! | `TWILIO_ACCOUNT_SID`  | unset: anonymous downloads  |
//! | `TWILIO_AUTH_TOKEN`   | unset: anonymous downloads  |
//! | `SESSION_TTL_SECS`    | unset: sessions never expire|
//! | `GEMINI_API_KEY`      | unset: media extraction off |
//! | `GEMINI_MODEL`        | `gemini-1.5-flash`          |

use crate::llm::LlmConfig;
use crate::media::BasicAuth;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub maps_api_key: Option<String>,
    /// Credentials for downloading Twilio-hosted media
    pub twilio_auth: Option<BasicAuth>,
    pub session_ttl: Option<Duration>,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = match get("ECOVOICE_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "ECOVOICE_PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let db_path = get("ECOVOICE_DB_PATH").unwrap_or_else(|| {
            let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.ecovoice/reports.db")
        });

        let twilio_auth = match (get("TWILIO_ACCOUNT_SID"), get("TWILIO_AUTH_TOKEN")) {
            (Some(username), Some(password)) => Some(BasicAuth { username, password }),
            _ => None,
        };

        let session_ttl = match get("SESSION_TTL_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SESSION_TTL_SECS",
                        expected: "a positive number of seconds",
                        value,
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            port,
            db_path,
            maps_api_key: get("GOOGLE_MAPS_API_KEY"),
            twilio_auth,
            session_ttl,
            llm: LlmConfig::from_lookup(&lookup),
        })
    }
}
