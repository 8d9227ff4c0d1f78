//! Shared plumbing for the pool binaries: logging and environment config.

use anyhow::{Context, Result};
use privacy_pool_lib::PoolConfig;
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Override `current` with env var `name` when it is set.
fn env_or<T>(name: &str, current: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}={raw}: {e}")),
        Err(_) => Ok(current),
    }
}

/// Resolve the pool config: defaults, then an optional JSON file, then
/// environment variables (after loading `.env`).
///
/// Env vars: TREE_LEVELS, ROOT_HISTORY_SIZE, FEE_RATE_PERCENT,
/// PRIMARY_COLLECTOR_PERCENT, WITHDRAWAL_CAP_PERCENT, PRIMARY_COLLECTOR,
/// SECONDARY_COLLECTOR.
pub fn load_config(path: Option<&Path>) -> Result<PoolConfig> {
    dotenv::dotenv().ok();

    let base = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PoolConfig::default(),
    };

    let config = PoolConfig {
        tree_levels: env_or("TREE_LEVELS", base.tree_levels)?,
        root_history_size: env_or("ROOT_HISTORY_SIZE", base.root_history_size)?,
        fee_rate_percent: env_or("FEE_RATE_PERCENT", base.fee_rate_percent)?,
        primary_collector_percent: env_or("PRIMARY_COLLECTOR_PERCENT", base.primary_collector_percent)?,
        withdrawal_cap_percent: env_or("WITHDRAWAL_CAP_PERCENT", base.withdrawal_cap_percent)?,
        primary_collector: env_or("PRIMARY_COLLECTOR", base.primary_collector)?,
        secondary_collector: env_or("SECONDARY_COLLECTOR", base.secondary_collector)?,
        init_leaf: base.init_leaf,
    };
    config.validate().context("invalid pool config")?;
    Ok(config)
}
