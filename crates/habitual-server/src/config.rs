use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use tracing::info;

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Read configuration from the environment (after `.env` is loaded).
    pub fn load() -> Result<Self> {
        let jwt_secret = env::var("HABITUAL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HABITUAL_JWT_SECRET is unset or still a placeholder");
        }

        let sweep_interval_secs: u64 = try_load("HABITUAL_SWEEP_INTERVAL_SECS", "3600")?;
        if sweep_interval_secs == 0 {
            bail!("HABITUAL_SWEEP_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            host: try_load("HABITUAL_HOST", "0.0.0.0")?,
            port: try_load("HABITUAL_PORT", "3000")?,
            db_path: try_load::<String>("HABITUAL_DB_PATH", "habitual.db")?.into(),
            jwt_secret,
            sweep_interval_secs,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
