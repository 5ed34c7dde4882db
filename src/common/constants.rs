/// Defines global constants and environment configuration for the transfer watcher.
///
/// Contains the default token, explorer endpoint, polling intervals and environment parsing.
use ethers::types::H160;
use std::str::FromStr;

use crate::common::errors::WatchError;

pub static PROJECT_NAME: &str = "transfer_watch";

/// PENDLE token on Ethereum mainnet.
pub static PENDLE: &str = "0x0c880f6761F1af8d9Aa9C466984b80DAb9a8c9e8";
pub static PENDLE_SYMBOL: &str = "PENDLE";
pub static PENDLE_DECIMALS: u32 = 18;

pub static ETHERSCAN_API_URL: &str = "https://api.etherscan.io/api";

/// Relative path of the exchange-wallet classification cache.
pub static DEFAULT_CACHE_PATH: &str = "cache/exchange_wallets.json";

pub static DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub static DEFAULT_ERROR_BACKOFF_SECS: u64 = 10;
pub static DEFAULT_MAX_BLOCK_RANGE: u64 = 2000;

/// Number of most recent explorer transactions inspected per address.
pub static RECENT_TX_LIMIT: usize = 5;

/// Reads an environment variable, treating unset and blank values alike as `None`.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses an optional variable, falling back to `default` when it is unset or blank.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, WatchError> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| WatchError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}

/// Holds all environment configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Env {
    /// HTTP(S) endpoint for RPC connections.
    pub rpc_url: String,
    /// Block explorer API key.
    pub etherscan_api_key: String,
    /// Block explorer API base URL.
    pub etherscan_api_url: String,
    /// Token contract whose Transfer events are watched.
    pub token_address: H160,
    pub token_symbol: String,
    pub token_decimals: u32,
    /// Whether counterparties are classified (needs the explorer API).
    pub classify: bool,
    /// Location of the exchange-wallet cache file.
    pub cache_path: String,
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    /// Largest block span requested in a single log query.
    pub max_block_range: u64,
    /// First block to scan, instead of the head at startup.
    pub start_block: Option<u64>,
    pub log_level: log::LevelFilter,
}

impl Env {
    /// Loads environment variables and constructs an `Env` instance.
    ///
    /// # Returns
    /// * `Result<Env, WatchError>` - Populated configuration, or a `Config` error naming the bad variable.
    pub fn new() -> Result<Self, WatchError> {
        let rpc_url = env_var("RPC_URL")
            .ok_or_else(|| WatchError::Config("RPC_URL is not set".to_string()))?;

        let token_address = match env_var("TOKEN_ADDRESS") {
            None => H160::from_str(PENDLE).map_err(|e| WatchError::Config(e.to_string()))?,
            Some(raw) => H160::from_str(&raw).map_err(|_| {
                WatchError::Config(format!("TOKEN_ADDRESS is not an address: {}", raw))
            })?,
        };

        let token_symbol = env_var("TOKEN_SYMBOL").unwrap_or_else(|| PENDLE_SYMBOL.to_string());
        let etherscan_api_url =
            env_var("ETHERSCAN_API_URL").unwrap_or_else(|| ETHERSCAN_API_URL.to_string());
        let cache_path = env_var("CACHE_PATH").unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string());

        let classify = parse_env("CLASSIFY", true)?;
        let etherscan_api_key = env_var("ETHERSCAN_API_KEY").unwrap_or_default();
        if classify && etherscan_api_key.is_empty() {
            return Err(WatchError::Config(
                "ETHERSCAN_API_KEY is required when CLASSIFY is enabled".to_string(),
            ));
        }

        let max_block_range = parse_env("MAX_BLOCK_RANGE", DEFAULT_MAX_BLOCK_RANGE)?;
        if max_block_range == 0 {
            return Err(WatchError::Config("MAX_BLOCK_RANGE must be positive".to_string()));
        }

        let start_block = match env_var("START_BLOCK") {
            None => None,
            Some(_) => Some(parse_env("START_BLOCK", 0u64)?),
        };

        Ok(Env {
            rpc_url,
            etherscan_api_key,
            etherscan_api_url,
            token_address,
            token_symbol,
            token_decimals: parse_env("TOKEN_DECIMALS", PENDLE_DECIMALS)?,
            classify,
            cache_path,
            poll_interval_secs: parse_env("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            error_backoff_secs: parse_env("ERROR_BACKOFF_SECS", DEFAULT_ERROR_BACKOFF_SECS)?,
            max_block_range,
            start_block,
            log_level: parse_env("LOG_LEVEL", log::LevelFilter::Info)?,
        })
    }
}
