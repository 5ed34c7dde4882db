/// Human-readable rendering of decoded transfers.
use colored::Colorize;
use log::info;

use crate::common::classifier::{TxCategory, TxDirection};
use crate::common::transfer::TransferEvent;
use crate::common::utils::{checksum, format_amount};

/// A transfer ready to be printed, with its optional classification.
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub event: TransferEvent,
    pub classification: Option<(TxCategory, TxDirection)>,
    pub symbol: String,
    pub decimals: u32,
}

impl TransferReport {
    pub fn amount(&self) -> String {
        format!("{} {}", format_amount(self.event.value, self.decimals), self.symbol)
    }

    /// Returns the lines describing the transfer, header first.
    pub fn pretty_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("New {} transfer (block #{})", self.symbol, self.event.block_number)
                .bold()
                .to_string(),
            format!("  From:   {}", checksum(&self.event.from)),
            format!("  To:     {}", checksum(&self.event.to)),
            format!("  Amount: {}", self.amount().yellow()),
            format!("  Tx:     {:?}", self.event.tx_hash),
        ];
        if let Some((category, direction)) = self.classification {
            let kind = match direction {
                TxDirection::None => category.to_string(),
                _ => format!("{} {}", category, direction),
            };
            lines.push(format!("  Type:   {}", kind.cyan()));
        }
        lines.push("-".repeat(50));
        lines
    }

    /// Logs the report line by line.
    pub fn pretty_print(&self) {
        for line in self.pretty_lines() {
            info!("{}", line);
        }
    }
}
