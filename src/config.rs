use std::{env, path::PathBuf, time::Duration};

use crate::{cart::DEFAULT_IDLE_TIMEOUT, checkout::DeliveryPolicy};

/// Where cart snapshots are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartStorageKind {
    Postgres,
    /// Process memory only; carts are lost on restart.
    Memory,
    File(PathBuf),
}

impl CartStorageKind {
    /// `CART_STORAGE` value (`postgres` when unset) plus the optional
    /// `CART_STORAGE_DIR` used by the file backend.
    pub fn parse(kind: Option<&str>, dir: Option<String>) -> anyhow::Result<Self> {
        match kind.map(str::trim) {
            Some("file") => Ok(Self::File(PathBuf::from(
                dir.unwrap_or_else(|| "data/carts".to_string()),
            ))),
            Some("memory") => Ok(Self::Memory),
            Some("postgres") | None => Ok(Self::Postgres),
            Some(other) => anyhow::bail!("unsupported CART_STORAGE value: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub cart_storage: CartStorageKind,
    pub session_idle_timeout: Duration,
    pub delivery: DeliveryPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let cart_storage = CartStorageKind::parse(
            env::var("CART_STORAGE").ok().as_deref(),
            env::var("CART_STORAGE_DIR").ok(),
        )?;

        let session_idle_timeout = match env::var("CART_SESSION_IDLE_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("CART_SESSION_IDLE_SECS must be a whole number of seconds: {e}")
            })?),
            Err(_) => DEFAULT_IDLE_TIMEOUT,
        };

        let defaults = DeliveryPolicy::default();
        let delivery = DeliveryPolicy::new(
            env::var("DELIVERY_METRO").unwrap_or(defaults.metro),
            parse_fee("DELIVERY_FEE_INSIDE", defaults.inside_fee)?,
            parse_fee("DELIVERY_FEE_OUTSIDE", defaults.outside_fee)?,
        );

        Ok(Self {
            port,
            database_url,
            host,
            cart_storage,
            session_idle_timeout,
            delivery,
        })
    }
}

fn parse_fee(name: &str, default: i64) -> anyhow::Result<i64> {
    match env::var(name) {
        Ok(raw) => {
            let fee = raw
                .trim()
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("{name} must be an integer: {e}"))?;
            anyhow::ensure!(fee >= 0, "{name} must not be negative");
            Ok(fee)
        }
        Err(_) => Ok(default),
    }
}
