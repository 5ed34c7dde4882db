/// Block explorer access: the Etherscan `account/txlist` API and the exchange-activity heuristic.
use async_trait::async_trait;
use ethers::types::H160;
use log::debug;
use serde::Deserialize;
use std::str::FromStr;

use crate::common::constants::RECENT_TX_LIMIT;
use crate::common::errors::WatchError;
use crate::common::exchanges::{exchange_label, mentions_exchange};
use crate::common::utils::checksum;

/// One entry of an address's transaction history, as reported by the explorer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExplorerTx {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl ExplorerTx {
    /// The fields that name the transaction's counterparties: raw `from`/`to`
    /// plus the public label of either side when one is known.
    pub fn counterparty_fields(&self) -> Vec<String> {
        let mut fields = vec![self.from.clone(), self.to.clone()];
        for side in [&self.from, &self.to] {
            if let Some(label) = H160::from_str(side).ok().as_ref().and_then(exchange_label) {
                fields.push(label.to_string());
            }
        }
        fields
    }
}

/// Transaction-history lookup used to classify wallets.
#[async_trait]
pub trait ExplorerApi {
    /// Most recent transactions of `address`, newest first, at most `limit` of them.
    async fn recent_transactions(
        &self,
        address: H160,
        limit: usize,
    ) -> Result<Vec<ExplorerTx>, WatchError>;
}

/// Whether any of the most recent transactions has an exchange as counterparty.
pub fn has_exchange_activity(txs: &[ExplorerTx]) -> bool {
    txs.iter()
        .take(RECENT_TX_LIMIT)
        .any(|tx| tx.counterparty_fields().iter().any(|f| mentions_exchange(f)))
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

/// Parses a `txlist` response body.
///
/// "No transactions found" is an empty history, not an error; any other non-`1` status or a
/// non-array `result` is reported as an `Explorer` error.
pub fn parse_txlist(body: &str) -> Result<Vec<ExplorerTx>, WatchError> {
    let response: EtherscanResponse = serde_json::from_str(body)
        .map_err(|e| WatchError::Explorer(format!("malformed response: {}", e)))?;

    if response.status != "1" {
        if response.message.starts_with("No transactions found") {
            return Ok(Vec::new());
        }
        return Err(WatchError::Explorer(format!(
            "{}: {}",
            response.message, response.result
        )));
    }

    serde_json::from_value::<Vec<ExplorerTx>>(response.result)
        .map_err(|e| WatchError::Explorer(format!("malformed transaction list: {}", e)))
}

/// Etherscan-compatible explorer client.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ExplorerApi for EtherscanClient {
    async fn recent_transactions(
        &self,
        address: H160,
        limit: usize,
    ) -> Result<Vec<ExplorerTx>, WatchError> {
        let address = checksum(&address);
        let offset = limit.to_string();
        debug!("Fetching {} recent transactions of {}", limit, address);

        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_txlist(&body)
    }
}
