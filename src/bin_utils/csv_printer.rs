use std::io::Write;

use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

/// Final state of one scripted wallet, keyed by its alias.
#[derive(Debug, Serialize)]
pub struct WalletRow {
    pub wallet: String,
    pub owner: String,
    pub balance: Decimal,
    pub balance_in_quote: Decimal,
}

/// Writes the report. Nothing, not even the header, is written without rows.
pub fn print_wallets<W>(
    output: &mut W,
    wallets: impl IntoIterator<Item = WalletRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for row in wallets {
        writer
            .serialize(&row)
            .with_context(|| format!("Failed to write wallet `{}`", row.wallet))?;
    }
    writer.flush().context("Failed to flush wallet report")
}
