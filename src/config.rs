use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_SESSION_LIFETIME_SECS: u64 = 12 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub session_lifetime: Duration,
    pub secure_cookies: bool,
    /// Rate limiting keys clients by forwarded headers instead of the peer
    /// address. Enable only behind a proxy that sets them.
    pub trust_proxy_headers: bool,
}

impl Config {
    /// Reads settings from the process environment, after loading `.env`
    /// when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or(&lookup, "BIND_ADDR", || {
            DEFAULT_BIND_ADDR.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: DEFAULT_BIND_ADDR.to_string(),
            })
        })?;

        let lifetime_secs: u64 =
            parse_or(&lookup, "SESSION_LIFETIME_SECS", || Ok(DEFAULT_SESSION_LIFETIME_SECS))?;
        if lifetime_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_LIFETIME_SECS",
                value: "0".to_string(),
            });
        }

        let secure_cookies = parse_or(&lookup, "SECURE_COOKIES", || Ok(true))?;
        let trust_proxy_headers = parse_or(&lookup, "TRUST_PROXY_HEADERS", || Ok(false))?;

        Ok(Self {
            bind_addr,
            database_url,
            session_lifetime: Duration::from_secs(lifetime_secs),
            secure_cookies,
            trust_proxy_headers,
        })
    }
}

fn parse_or<F, T, D>(lookup: &F, name: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    D: FnOnce() -> Result<T, ConfigError>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => default(),
    }
}
