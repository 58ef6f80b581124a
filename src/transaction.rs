use rust_decimal::Decimal;
use serde::Serialize;

/// Ledger entry for one committed transfer. Entries are appended once and
/// never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub from_address: String,
    pub to_address: String,
    pub fee: Decimal,
    pub amount: Decimal,
}

impl Transaction {
    pub fn touches(&self, address: &str) -> bool {
        self.from_address == address || self.to_address == address
    }
}

/// Platform-wide totals. Fees are not credited to any wallet, so their sum
/// is the operator's profit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub profit: Decimal,
    pub transaction_count: usize,
}

impl Statistics {
    /// `None` when the profit no longer fits a [`Decimal`].
    pub fn record(self, transaction: &Transaction) -> Option<Self> {
        Some(Self {
            profit: self.profit.checked_add(transaction.fee)?,
            transaction_count: self.transaction_count + 1,
        })
    }

    pub fn from_log<'a>(log: impl IntoIterator<Item = &'a Transaction>) -> Option<Self> {
        log.into_iter()
            .try_fold(Self::default(), |stats, tx| stats.record(tx))
    }
}
