/// Error type shared by the watcher, the classifier and their collaborators.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// Missing or malformed environment configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The RPC endpoint failed or returned something unusable.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// A log could not be decoded as an ERC-20 Transfer.
    #[error("decode error: {0}")]
    Decode(String),

    /// The block explorer API failed or returned malformed data.
    #[error("explorer error: {0}")]
    Explorer(String),

    /// The classification cache could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for WatchError {
    fn from(e: reqwest::Error) -> Self {
        WatchError::Explorer(e.to_string())
    }
}

impl From<std::io::Error> for WatchError {
    fn from(e: std::io::Error) -> Self {
        WatchError::Storage(e.to_string())
    }
}
