//! transfer_watch - ERC-20 Transfer monitor
use anyhow::Context;
use dotenv::dotenv;
use ethers::providers::{Http, Provider};
use log::info;
use std::sync::Arc;

use transfer_watch::common::chain::{ChainReader, RpcChain};
use transfer_watch::common::constants::Env;
use transfer_watch::common::explorer::EtherscanClient;
use transfer_watch::common::store::{JsonFileStore, KeyValueStore};
use transfer_watch::common::utils::setup_logger;
use transfer_watch::common::wallet_cache::ExchangeWalletCache;
use transfer_watch::monitor::watcher::{starting_watermark, TransferWatcher, WatcherConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file.
    dotenv().ok();

    let env = Env::new()?;
    setup_logger(env.log_level)?;

    info!("Starting transfer_watch");

    let provider = Provider::<Http>::try_from(env.rpc_url.as_str())
        .context("RPC_URL is not a valid HTTP endpoint")?;
    let chain = RpcChain::new(Arc::new(provider));

    // Refuse to start without a reachable node.
    let chain_id = chain
        .chain_id()
        .await
        .context("Failed to connect to RPC node")?;
    info!("Connected to RPC node (chain id {})", chain_id);

    let wallets = if env.classify {
        let store = JsonFileStore::open(&env.cache_path)?;
        info!(
            "Loaded {} cached wallet verdicts from {}",
            store.len(),
            store.path().display()
        );
        let explorer = EtherscanClient::new(&env.etherscan_api_url, &env.etherscan_api_key);
        Some(ExchangeWalletCache::new(store, explorer))
    } else {
        info!("Counterparty classification disabled");
        None
    };

    let head = chain.block_number().await?;
    let watermark = starting_watermark(head, env.start_block);

    let watcher = TransferWatcher::new(chain, wallets, WatcherConfig::from(&env), watermark);
    watcher.run().await
}
