use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub address: String,
    pub balance: Decimal,
    pub owner_token: String,
}

/// Wallet as shown to its owner: balance in the base unit and converted
/// at the current exchange rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub balance: Decimal,
    pub balance_in_quote: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEventKind {
    Debited { amount: Decimal, fee: Decimal },
    Credited { amount: Decimal },
}

/// Balance mutation produced by [`Wallet::handle_debit`] or
/// [`Wallet::handle_credit`]. `expected_balance` is the balance the event
/// was validated against; storage refuses to apply it to any other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEvent {
    pub address: String,
    pub expected_balance: Decimal,
    pub kind: WalletEventKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Insufficient balance: {required} required, {available} available")]
    Insufficient {
        required: Decimal,
        available: Decimal,
    },
    #[error("Balance arithmetic overflow")]
    Overflow,
}

impl Wallet {
    pub fn new(address: String, owner_token: String, balance: Decimal) -> Self {
        Self {
            address,
            balance,
            owner_token,
        }
    }

    pub fn is_owned_by(&self, token: &str) -> bool {
        self.owner_token == token
    }

    pub fn shares_owner_with(&self, other: &Wallet) -> bool {
        self.owner_token == other.owner_token
    }

    /// `None` when the converted balance does not fit a [`Decimal`].
    pub fn info(&self, rate: Decimal) -> Option<WalletInfo> {
        Some(WalletInfo {
            address: self.address.clone(),
            balance: self.balance,
            balance_in_quote: self.balance.checked_mul(rate)?,
        })
    }

    pub fn apply(&mut self, event: &WalletEvent) {
        match event.kind {
            WalletEventKind::Debited { amount, fee } => {
                self.balance -= amount + fee;
            }
            WalletEventKind::Credited { amount } => {
                self.balance += amount;
            }
        }
    }

    pub fn handle_debit(&self, amount: Decimal, fee: Decimal) -> Result<WalletEvent, BalanceError> {
        let required = amount.checked_add(fee).ok_or(BalanceError::Overflow)?;
        // equality is allowed and leaves the wallet empty
        if self.balance < required {
            return Err(BalanceError::Insufficient {
                required,
                available: self.balance,
            });
        }
        Ok(WalletEvent {
            address: self.address.clone(),
            expected_balance: self.balance,
            kind: WalletEventKind::Debited { amount, fee },
        })
    }

    pub fn handle_credit(&self, amount: Decimal) -> Result<WalletEvent, BalanceError> {
        self.balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(WalletEvent {
            address: self.address.clone(),
            expected_balance: self.balance,
            kind: WalletEventKind::Credited { amount },
        })
    }
}
