use std::env;

use anyhow::{anyhow, Context, Result};
use common::{
    fill::ClampPolicy,
    order::{OrderPolicy, UnmatchedPlacement},
};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BIN_HEIGHT_CM: f64 = 200.0;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub frontend_origin: String,
    /// Empty disables the assistant.
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub bin_height_cm: f64,
    pub fill_policy: ClampPolicy,
    pub order: OrderPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let database_url = lookup("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let port = var("PORT", "8081")
            .parse()
            .context("PORT must be a port number")?;

        let bin_height_cm: f64 = match lookup("BIN_HEIGHT_CM") {
            Some(v) => v.parse().context("BIN_HEIGHT_CM must be a number")?,
            None => DEFAULT_BIN_HEIGHT_CM,
        };
        if !(bin_height_cm.is_finite() && bin_height_cm > 0.0) {
            anyhow::bail!("BIN_HEIGHT_CM must be positive, got {bin_height_cm}");
        }

        let clamp: bool = var("FILL_LEVEL_CLAMP", "true")
            .parse()
            .context("FILL_LEVEL_CLAMP must be true or false")?;

        let mut order = OrderPolicy::default();
        if let Some(names) = lookup("BIN_ORDER") {
            order.canonical = names
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
        }
        order.unmatched = var("UNMATCHED_BINS", "last").parse::<UnmatchedPlacement>()?;

        Ok(Self {
            database_url,
            bind_addr: var("BIND_ADDR", "127.0.0.1"),
            port,
            frontend_origin: var("FRONTEND_ORIGIN", "http://127.0.0.1:8080"),
            gemini_api_key: var("GEMINI_API_KEY", ""),
            gemini_model: var("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            bin_height_cm,
            fill_policy: ClampPolicy::from_flag(clamp),
            order,
        })
    }
}
