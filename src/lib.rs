/// Main library module for the transfer watcher.
///
/// `common` holds configuration, chain and explorer access, the exchange-wallet cache and the
/// transfer classifier; `monitor` holds the polling loop and console reporting.
///
pub mod common;
pub mod monitor;
