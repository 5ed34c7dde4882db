use ethers::types::H160;
use std::fmt;

use crate::common::chain::ChainReader;
use crate::common::errors::WatchError;
use crate::common::explorer::ExplorerApi;
use crate::common::store::KeyValueStore;
use crate::common::wallet_cache::ExchangeWalletCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxCategory {
    Cex,
    Dex,
    WalletToWallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxDirection {
    Withdraw,
    Deposit,
    Buy,
    Sell,
    None,
}

impl fmt::Display for TxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxCategory::Cex => write!(f, "CEX"),
            TxCategory::Dex => write!(f, "DEX"),
            TxCategory::WalletToWallet => write!(f, "Wallet-to-Wallet"),
        }
    }
}

impl fmt::Display for TxDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxDirection::Withdraw => write!(f, "withdraw"),
            TxDirection::Deposit => write!(f, "deposit"),
            TxDirection::Buy => write!(f, "buy"),
            TxDirection::Sell => write!(f, "sell"),
            TxDirection::None => write!(f, "none"),
        }
    }
}

/// The decision cascade over already-known facts. First match wins.
pub fn decide(
    from_is_exchange: bool,
    to_is_exchange: bool,
    from_is_contract: bool,
    to_is_contract: bool,
) -> (TxCategory, TxDirection) {
    if from_is_exchange {
        (TxCategory::Cex, TxDirection::Withdraw)
    } else if to_is_exchange {
        (TxCategory::Cex, TxDirection::Deposit)
    } else if from_is_contract || to_is_contract {
        if from_is_contract {
            (TxCategory::Dex, TxDirection::Buy)
        } else {
            (TxCategory::Dex, TxDirection::Sell)
        }
    } else {
        (TxCategory::WalletToWallet, TxDirection::None)
    }
}

/// Classifies a transfer by its counterparties.
///
/// Facts are gathered lazily in decision order, so a CEX verdict never touches bytecode and
/// `to` is not looked up when `from` is already an exchange. Exchange checks cannot fail;
/// a bytecode lookup failure is returned to the caller.
pub async fn classify<C, S, E>(
    chain: &C,
    wallets: &mut ExchangeWalletCache<S, E>,
    from: H160,
    to: H160,
) -> Result<(TxCategory, TxDirection), WatchError>
where
    C: ChainReader + ?Sized,
    S: KeyValueStore,
    E: ExplorerApi,
{
    if wallets.is_known_exchange_wallet(from).await {
        return Ok(decide(true, false, false, false));
    }
    if wallets.is_known_exchange_wallet(to).await {
        return Ok(decide(false, true, false, false));
    }

    let from_is_contract = chain.has_code(from).await?;
    let to_is_contract = if from_is_contract {
        false
    } else {
        chain.has_code(to).await?
    };
    Ok(decide(false, false, from_is_contract, to_is_contract))
}
