use rust_decimal::Decimal;
use thiserror::Error;

/// Finest amount a transfer may move: 8 decimals, one satoshi.
pub const MAX_AMOUNT_SCALE: u32 = 8;

/// Validated transfer request. Holding one guarantees a positive amount of
/// at most [`MAX_AMOUNT_SCALE`] decimals and two distinct wallet addresses; whether those wallets exist is decided
/// later, under their locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferCommandError {
    #[error("Transfer amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
    #[error("Transfer amount {amount} is finer than {MAX_AMOUNT_SCALE} decimals")]
    TooPrecise { amount: Decimal },
    #[error("Source and destination wallets must differ")]
    SameWallet,
}

impl TransferCommand {
    pub fn parse(
        from_address: &str,
        to_address: &str,
        amount: Decimal,
    ) -> Result<Self, TransferCommandError> {
        if amount <= Decimal::ZERO {
            return Err(TransferCommandError::NonPositiveAmount { amount });
        }
        if amount.normalize().scale() > MAX_AMOUNT_SCALE {
            return Err(TransferCommandError::TooPrecise { amount });
        }
        if from_address == to_address {
            return Err(TransferCommandError::SameWallet);
        }
        Ok(Self {
            from_address: from_address.to_owned(),
            to_address: to_address.to_owned(),
            amount,
        })
    }

    /// Both addresses in a fixed global order, so that every transfer takes
    /// wallet locks in the same sequence.
    pub fn lock_order(&self) -> [&str; 2] {
        let (a, b) = (self.from_address.as_str(), self.to_address.as_str());
        if a <= b { [a, b] } else { [b, a] }
    }
}
