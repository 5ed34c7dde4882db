/// Shared building blocks: configuration, errors, chain and explorer access, decoding,
/// the exchange-wallet cache and the classifier.
pub mod chain;
pub mod classifier;
pub mod constants;
pub mod errors;
pub mod exchanges;
pub mod explorer;
pub mod store;
pub mod transfer;
pub mod utils;
pub mod wallet_cache;
