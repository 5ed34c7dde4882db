/// Polling loop over a token's Transfer logs and the console output it produces.
pub mod report;
pub mod watcher;
