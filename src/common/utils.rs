/// Utility functions for logging, address rendering and token amount formatting.
use anyhow::Result;
use ethers::types::{H160, U256};
use ethers::utils::{format_units, to_checksum};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

use crate::common::constants::*;

/// Sets up a colored logger for the project.
///
/// # Parameters
/// * `level`: LevelFilter - Level applied to this crate; dependencies log warnings only.
///
/// # Returns
/// * `Result<()>` - Ok if successful.
pub fn setup_logger(level: LevelFilter) -> Result<()> {
    let colors = ColoredLevelConfig {
        trace: Color::Cyan,
        debug: Color::Magenta,
        info: Color::Green,
        warn: Color::Yellow,
        error: Color::BrightRed,
        ..ColoredLevelConfig::new()
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                colors.color(record.level()),
                message
            ))
        })
        .chain(std::io::stdout())
        .level(LevelFilter::Warn)
        .level_for(PROJECT_NAME, level)
        .apply()?;

    Ok(())
}

/// Renders an address in its EIP-55 checksum form, the canonical cache key.
pub fn checksum(address: &H160) -> String {
    to_checksum(address, None)
}

/// Formats a raw token amount with the given number of decimals.
///
/// Trailing zeros of the fractional part are dropped, so `1.500000000000000000` becomes `1.5`.
pub fn format_amount(value: U256, decimals: u32) -> String {
    match format_units(value, decimals) {
        Ok(formatted) if formatted.contains('.') => {
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            trimmed.to_string()
        }
        Ok(formatted) => formatted,
        Err(_) => value.to_string(),
    }
}
