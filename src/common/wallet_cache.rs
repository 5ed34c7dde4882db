/// Read-through cache of "is this address a known exchange wallet" verdicts.
///
/// A verdict is computed once per address from its explorer history and then kept forever;
/// every miss is written through to the backing store immediately.
use ethers::types::H160;
use log::{debug, warn};

use crate::common::constants::RECENT_TX_LIMIT;
use crate::common::explorer::{has_exchange_activity, ExplorerApi};
use crate::common::store::KeyValueStore;
use crate::common::utils::checksum;

pub struct ExchangeWalletCache<S, E> {
    store: S,
    explorer: E,
}

impl<S: KeyValueStore, E: ExplorerApi> ExchangeWalletCache<S, E> {
    pub fn new(store: S, explorer: E) -> Self {
        Self { store, explorer }
    }

    /// Returns whether `address` is a known exchange wallet.
    ///
    /// Cached verdicts are returned without I/O. On a miss the explorer is asked once; a failed
    /// or malformed answer counts as `false` and is cached like any other verdict. A failure to
    /// persist is logged and the verdict still returned.
    pub async fn is_known_exchange_wallet(&mut self, address: H160) -> bool {
        let key = checksum(&address);
        if let Some(verdict) = self.store.get(&key) {
            return verdict;
        }

        let verdict = match self
            .explorer
            .recent_transactions(address, RECENT_TX_LIMIT)
            .await
        {
            Ok(txs) => has_exchange_activity(&txs),
            Err(e) => {
                warn!("Exchange lookup for {} failed, assuming wallet: {}", key, e);
                false
            }
        };

        debug!("Classified {} as exchange wallet: {}", key, verdict);
        self.store.set(key, verdict);
        if let Err(e) = self.store.flush() {
            warn!("Failed to persist exchange wallet cache: {}", e);
        }
        verdict
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
