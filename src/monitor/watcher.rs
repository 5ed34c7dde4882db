/// Block-polling loop over a single token's Transfer logs.
///
/// The watcher keeps a watermark (last processed block), asks the chain for the head on every
/// tick and fetches logs for the blocks it has not seen yet. All work happens inline on the
/// calling task.
use ethers::types::{Log, H160};
use log::{debug, error, info, warn};
use tokio::time::{sleep, Duration};

use crate::common::chain::ChainReader;
use crate::common::classifier::classify;
use crate::common::constants::Env;
use crate::common::errors::WatchError;
use crate::common::explorer::ExplorerApi;
use crate::common::store::KeyValueStore;
use crate::common::transfer::decode_transfer;
use crate::common::wallet_cache::ExchangeWalletCache;
use crate::monitor::report::TransferReport;

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub token: H160,
    pub symbol: String,
    pub decimals: u32,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub max_block_range: u64,
}

impl From<&Env> for WatcherConfig {
    fn from(env: &Env) -> Self {
        Self {
            token: env.token_address,
            symbol: env.token_symbol.clone(),
            decimals: env.token_decimals,
            poll_interval: Duration::from_secs(env.poll_interval_secs),
            error_backoff: Duration::from_secs(env.error_backoff_secs),
            max_block_range: env.max_block_range,
        }
    }
}

/// Result of a single polling tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The head has not moved past the watermark.
    Idle { head: u64 },
    /// Logs of `from_block..=to_block` were handled; `skipped` of them could not be.
    Processed {
        from_block: u64,
        to_block: u64,
        logs: usize,
        skipped: usize,
    },
}

/// Watermark to start from: just before `start_block` when one is configured, else the head.
pub fn starting_watermark(head: u64, start_block: Option<u64>) -> u64 {
    match start_block {
        Some(block) => block.saturating_sub(1),
        None => head,
    }
}

pub struct TransferWatcher<C, S, E> {
    chain: C,
    wallets: Option<ExchangeWalletCache<S, E>>,
    config: WatcherConfig,
    watermark: u64,
}

impl<C, S, E> TransferWatcher<C, S, E>
where
    C: ChainReader,
    S: KeyValueStore,
    E: ExplorerApi,
{
    /// Creates a watcher. Without a wallet cache transfers are reported unclassified.
    pub fn new(
        chain: C,
        wallets: Option<ExchangeWalletCache<S, E>>,
        config: WatcherConfig,
        watermark: u64,
    ) -> Self {
        Self {
            chain,
            wallets,
            config,
            watermark,
        }
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Runs one polling tick.
    ///
    /// Logs that fail to decode are logged and counted in `skipped`. Any other failure, including
    /// an RPC error while classifying, aborts the tick with the watermark untouched, so the same
    /// range is retried and transfers already printed from it are printed again.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, WatchError> {
        let head = self.chain.block_number().await?;
        if head <= self.watermark {
            return Ok(PollOutcome::Idle { head });
        }

        let from_block = self.watermark + 1;
        let to_block = head.min(self.watermark + self.config.max_block_range);
        info!("Checking transfers from block {} to {}", from_block, to_block);

        let logs = self
            .chain
            .transfer_logs(self.config.token, from_block, to_block)
            .await?;
        if !logs.is_empty() {
            info!("Found {} new logs", logs.len());
        }

        let mut skipped = 0;
        for log in logs.iter() {
            match self.handle_log(log).await {
                Ok(report) => report.pretty_print(),
                Err(e @ WatchError::Decode(_)) => {
                    warn!("Skipping log {:?}: {}", log.transaction_hash, e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.watermark = to_block;
        Ok(PollOutcome::Processed {
            from_block,
            to_block,
            logs: logs.len(),
            skipped,
        })
    }

    /// Decodes and, when a wallet cache is present, classifies a single log.
    pub async fn handle_log(&mut self, log: &Log) -> Result<TransferReport, WatchError> {
        debug!("Raw event log: {:?}", log);
        if let Some(signature) = log.topics.first() {
            debug!("Received event signature: {:?}", signature);
        }
        debug!("Log data: 0x{}", hex::encode(&log.data));

        let event = decode_transfer(log)?;
        let classification = match self.wallets.as_mut() {
            Some(wallets) => Some(classify(&self.chain, wallets, event.from, event.to).await?),
            None => None,
        };

        Ok(TransferReport {
            event,
            classification,
            symbol: self.config.symbol.clone(),
            decimals: self.config.decimals,
        })
    }

    /// Polls forever. Errors are logged and followed by the longer backoff sleep.
    pub async fn run(mut self) -> ! {
        info!(
            "Monitoring {} transfers of {:?} from block {}",
            self.config.symbol,
            self.config.token,
            self.watermark + 1
        );

        loop {
            match self.poll_once().await {
                Ok(PollOutcome::Idle { head }) => {
                    debug!("No new blocks (head #{})", head);
                    sleep(self.config.poll_interval).await;
                }
                Ok(PollOutcome::Processed {
                    to_block, skipped, ..
                }) => {
                    if skipped > 0 {
                        warn!("Skipped {} malformed logs up to block #{}", skipped, to_block);
                    }
                    sleep(self.config.poll_interval).await;
                }
                Err(e) => {
                    error!("Error fetching transfers: {}", e);
                    sleep(self.config.error_backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::classifier::{TxCategory, TxDirection};
    use crate::common::explorer::ExplorerTx;
    use crate::common::store::MemoryStore;
    use crate::common::transfer::tests::transfer_log;
    use crate::common::wallet_cache::tests::FakeExplorer;
    use async_trait::async_trait;
    use ethers::types::{H256, U256};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Chain with a movable head, a fixed set of logs and a switchable outage.
    #[derive(Default)]
    struct ScriptedChain {
        head: AtomicU64,
        logs: Vec<Log>,
        contracts: HashSet<H160>,
        down: AtomicBool,
        /// Fails bytecode lookups only, leaving heads and logs readable.
        code_down: AtomicBool,
        queried: Mutex<Vec<(u64, u64)>>,
    }

    impl ScriptedChain {
        fn check(&self) -> Result<(), WatchError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(WatchError::Rpc("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ChainReader for ScriptedChain {
        async fn chain_id(&self) -> Result<u64, WatchError> {
            self.check()?;
            Ok(1)
        }

        async fn block_number(&self) -> Result<u64, WatchError> {
            self.check()?;
            Ok(self.head.load(Ordering::SeqCst))
        }

        async fn transfer_logs(
            &self,
            _token: H160,
            from_block: u64,
            to_block: u64,
        ) -> Result<Vec<Log>, WatchError> {
            self.check()?;
            self.queried.lock().unwrap().push((from_block, to_block));
            Ok(self
                .logs
                .iter()
                .filter(|l| {
                    let n = l.block_number.unwrap_or_default().as_u64();
                    n >= from_block && n <= to_block
                })
                .cloned()
                .collect())
        }

        async fn has_code(&self, address: H160) -> Result<bool, WatchError> {
            self.check()?;
            if self.code_down.load(Ordering::SeqCst) {
                return Err(WatchError::Rpc("eth_getCode timed out".to_string()));
            }
            Ok(self.contracts.contains(&address))
        }
    }

    fn config(max_block_range: u64) -> WatcherConfig {
        WatcherConfig {
            token: H160::zero(),
            symbol: "PENDLE".to_string(),
            decimals: 18,
            poll_interval: Duration::from_millis(1),
            error_backoff: Duration::from_millis(1),
            max_block_range,
        }
    }

    type Unclassified = TransferWatcher<ScriptedChain, MemoryStore, FakeExplorer>;

    #[test]
    fn watermark_starts_before_configured_block() {
        assert_eq!(starting_watermark(500, None), 500);
        assert_eq!(starting_watermark(500, Some(100)), 99);
        assert_eq!(starting_watermark(500, Some(0)), 0);
    }

    #[tokio::test]
    async fn idle_until_head_moves() {
        let chain = ScriptedChain::default();
        chain.head.store(100, Ordering::SeqCst);
        let mut watcher: Unclassified = TransferWatcher::new(chain, None, config(2000), 100);

        assert_eq!(watcher.poll_once().await.unwrap(), PollOutcome::Idle { head: 100 });
        assert!(watcher.chain().queried.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn processes_new_range_and_advances() {
        let alice = H160::repeat_byte(0x01);
        let bob = H160::repeat_byte(0x02);
        let chain = ScriptedChain {
            logs: vec![
                transfer_log(alice, bob, U256::exp10(18), 101),
                transfer_log(bob, alice, U256::exp10(17), 103),
            ],
            ..Default::default()
        };
        chain.head.store(103, Ordering::SeqCst);
        let mut watcher: Unclassified = TransferWatcher::new(chain, None, config(2000), 100);

        let outcome = watcher.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Processed {
                from_block: 101,
                to_block: 103,
                logs: 2,
                skipped: 0
            }
        );
        assert_eq!(watcher.watermark(), 103);
        assert_eq!(watcher.poll_once().await.unwrap(), PollOutcome::Idle { head: 103 });
    }

    #[tokio::test]
    async fn clamps_range_to_max_block_range() {
        let chain = ScriptedChain::default();
        chain.head.store(1_000, Ordering::SeqCst);
        let mut watcher: Unclassified = TransferWatcher::new(chain, None, config(300), 0);

        watcher.poll_once().await.unwrap();
        watcher.poll_once().await.unwrap();
        assert_eq!(watcher.watermark(), 600);
        assert_eq!(
            *watcher.chain().queried.lock().unwrap(),
            vec![(1, 300), (301, 600)]
        );
    }

    #[tokio::test]
    async fn malformed_logs_are_skipped() {
        let mut broken = transfer_log(H160::zero(), H160::repeat_byte(3), U256::one(), 11);
        broken.topics.truncate(1);
        let chain = ScriptedChain {
            logs: vec![
                broken,
                transfer_log(H160::zero(), H160::repeat_byte(3), U256::one(), 12),
            ],
            ..Default::default()
        };
        chain.head.store(12, Ordering::SeqCst);
        let mut watcher: Unclassified = TransferWatcher::new(chain, None, config(2000), 10);

        let outcome = watcher.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Processed {
                from_block: 11,
                to_block: 12,
                logs: 2,
                skipped: 1
            }
        );
        assert_eq!(watcher.watermark(), 12);
    }

    #[tokio::test]
    async fn rpc_outage_keeps_watermark() {
        let chain = ScriptedChain::default();
        chain.head.store(50, Ordering::SeqCst);
        chain.down.store(true, Ordering::SeqCst);
        let mut watcher: Unclassified = TransferWatcher::new(chain, None, config(2000), 40);

        assert!(matches!(watcher.poll_once().await, Err(WatchError::Rpc(_))));
        assert_eq!(watcher.watermark(), 40);

        watcher.chain().down.store(false, Ordering::SeqCst);
        let outcome = watcher.poll_once().await.unwrap();
        assert!(matches!(outcome, PollOutcome::Processed { from_block: 41, to_block: 50, .. }));
    }

    #[tokio::test]
    async fn classifies_when_cache_present() {
        let exchange = H160::repeat_byte(0xee);
        let router = H160::repeat_byte(0xcc);
        let alice = H160::repeat_byte(0x01);
        let chain = ScriptedChain {
            contracts: [router].into_iter().collect(),
            ..Default::default()
        };
        let explorer = FakeExplorer::default()
            .with_exchange(exchange)
            .with_plain(router)
            .with_plain(alice);
        let wallets = ExchangeWalletCache::new(MemoryStore::new(), explorer.clone());
        let mut watcher = TransferWatcher::new(chain, Some(wallets), config(2000), 0);

        let deposit = watcher
            .handle_log(&transfer_log(alice, exchange, U256::one(), 1))
            .await
            .unwrap();
        assert_eq!(
            deposit.classification,
            Some((TxCategory::Cex, TxDirection::Deposit))
        );

        let buy = watcher
            .handle_log(&transfer_log(router, alice, U256::one(), 2))
            .await
            .unwrap();
        assert_eq!(buy.classification, Some((TxCategory::Dex, TxDirection::Buy)));
        // alice, exchange and router were each looked up once
        assert_eq!(explorer.calls(), 3);
    }

    #[tokio::test]
    async fn explorer_outage_still_classifies() {
        let alice = H160::repeat_byte(0x01);
        let bob = H160::repeat_byte(0x02);
        let explorer = FakeExplorer {
            histories: [(bob, vec![ExplorerTx::default()])].into_iter().collect(),
            ..Default::default()
        };
        let wallets = ExchangeWalletCache::new(MemoryStore::new(), explorer);
        let mut watcher =
            TransferWatcher::new(ScriptedChain::default(), Some(wallets), config(2000), 0);

        // alice has no canned history, so her lookup fails and counts as a plain wallet
        let report = watcher
            .handle_log(&transfer_log(alice, bob, U256::one(), 1))
            .await
            .unwrap();
        assert_eq!(
            report.classification,
            Some((TxCategory::WalletToWallet, TxDirection::None))
        );
        assert_eq!(report.event.tx_hash, H256::repeat_byte(0xab));
    }

    #[tokio::test]
    async fn classification_rpc_failure_retries_range() {
        let alice = H160::repeat_byte(0x01);
        let bob = H160::repeat_byte(0x02);
        let chain = ScriptedChain {
            logs: vec![transfer_log(alice, bob, U256::one(), 11)],
            ..Default::default()
        };
        chain.head.store(11, Ordering::SeqCst);
        chain.code_down.store(true, Ordering::SeqCst);
        let explorer = FakeExplorer::default().with_plain(alice).with_plain(bob);
        let wallets = ExchangeWalletCache::new(MemoryStore::new(), explorer);
        let mut watcher = TransferWatcher::new(chain, Some(wallets), config(2000), 10);

        assert!(matches!(watcher.poll_once().await, Err(WatchError::Rpc(_))));
        assert_eq!(watcher.watermark(), 10);

        watcher.chain().code_down.store(false, Ordering::SeqCst);
        let outcome = watcher.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Processed {
                from_block: 11,
                to_block: 11,
                logs: 1,
                skipped: 0
            }
        );
        assert_eq!(watcher.watermark(), 11);
        assert_eq!(*watcher.chain().queried.lock().unwrap(), vec![(11, 11), (11, 11)]);
    }
}
