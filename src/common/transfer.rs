/// ERC-20 Transfer event definition and log decoding.
use ethers::types::{Log, H160, H256, U256};
use ethers::utils::keccak256;
use lazy_static::lazy_static;

use crate::common::errors::WatchError;

pub static TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

lazy_static! {
    /// topic0 of every ERC-20 Transfer log.
    pub static ref TRANSFER_TOPIC: H256 = H256::from(keccak256(TRANSFER_EVENT.as_bytes()));
}

/// A decoded ERC-20 Transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEvent {
    /// Emitting token contract.
    pub token: H160,
    pub from: H160,
    pub to: H160,
    /// Raw token units.
    pub value: U256,
    pub tx_hash: H256,
    pub block_number: u64,
    pub log_index: u64,
}

/// Address held in an indexed topic: the lowest 20 bytes of the 32-byte word.
fn topic_to_address(topic: &H256) -> H160 {
    H160::from(*topic)
}

/// Decodes a single log into a `TransferEvent`.
///
/// # Parameters
/// * `log`: &Log - Raw log as returned by `eth_getLogs`.
///
/// # Returns
/// * `Result<TransferEvent, WatchError>` - The transfer, or a `Decode` error naming what is missing.
pub fn decode_transfer(log: &Log) -> Result<TransferEvent, WatchError> {
    let signature = log
        .topics
        .first()
        .ok_or_else(|| WatchError::Decode("log has no topics".to_string()))?;
    if *signature != *TRANSFER_TOPIC {
        return Err(WatchError::Decode(format!(
            "unexpected event signature {:?}",
            signature
        )));
    }
    // ERC-721 also emits Transfer(address,address,uint256) but indexes the id as a 4th topic
    if log.topics.len() != 3 {
        return Err(WatchError::Decode(format!(
            "expected 3 topics, got {}",
            log.topics.len()
        )));
    }
    if log.data.len() < 32 {
        return Err(WatchError::Decode(format!(
            "expected 32 bytes of data, got {}",
            log.data.len()
        )));
    }

    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| WatchError::Decode("log has no transaction hash".to_string()))?;
    let block_number = log
        .block_number
        .ok_or_else(|| WatchError::Decode("log has no block number".to_string()))?;

    Ok(TransferEvent {
        token: log.address,
        from: topic_to_address(&log.topics[1]),
        to: topic_to_address(&log.topics[2]),
        value: U256::from_big_endian(&log.data[..32]),
        tx_hash,
        block_number: block_number.as_u64(),
        log_index: log.log_index.map(|i| i.as_u64()).unwrap_or_default(),
    })
}
