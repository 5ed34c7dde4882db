/// RPC access used by the watcher and the classifier.
///
/// `ChainReader` narrows the provider down to the four calls this crate makes, so the polling
/// loop and classifier can run against a scripted chain in tests.
use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::{Filter, Log, H160};
use std::sync::Arc;

use crate::common::errors::WatchError;
use crate::common::transfer::TRANSFER_EVENT;

#[async_trait]
pub trait ChainReader {
    async fn chain_id(&self) -> Result<u64, WatchError>;

    /// Height of the latest block.
    async fn block_number(&self) -> Result<u64, WatchError>;

    /// Transfer logs emitted by `token` in the inclusive block range.
    async fn transfer_logs(
        &self,
        token: H160,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, WatchError>;

    /// Whether bytecode is deployed at `address`.
    async fn has_code(&self, address: H160) -> Result<bool, WatchError>;
}

/// `ChainReader` over any ethers middleware.
#[derive(Debug)]
pub struct RpcChain<M> {
    provider: Arc<M>,
}

impl<M> RpcChain<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

fn rpc_err<E: std::fmt::Display>(e: E) -> WatchError {
    WatchError::Rpc(e.to_string())
}

#[async_trait]
impl<M: Middleware> ChainReader for RpcChain<M> {
    async fn chain_id(&self) -> Result<u64, WatchError> {
        let id = self.provider.get_chainid().await.map_err(rpc_err)?;
        Ok(id.as_u64())
    }

    async fn block_number(&self) -> Result<u64, WatchError> {
        let number = self.provider.get_block_number().await.map_err(rpc_err)?;
        Ok(number.as_u64())
    }

    async fn transfer_logs(
        &self,
        token: H160,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, WatchError> {
        let filter = Filter::new()
            .address(token)
            .event(TRANSFER_EVENT)
            .from_block(from_block)
            .to_block(to_block);
        self.provider.get_logs(&filter).await.map_err(rpc_err)
    }

    async fn has_code(&self, address: H160) -> Result<bool, WatchError> {
        let code = self.provider.get_code(address, None).await.map_err(rpc_err)?;
        Ok(!code.as_ref().is_empty())
    }
}
