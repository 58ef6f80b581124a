use rust_decimal::Decimal;

pub trait FeePolicy: Send + Sync {
    /// `None` when the fee cannot be represented exactly.
    fn fee_for(&self, amount: Decimal) -> Option<Decimal>;
}

/// Charges a fixed ratio of the transferred amount. The product is never
/// rounded: if it does not fit at the combined scale of amount and ratio,
/// there is no fee and the transfer cannot proceed.
#[derive(Debug, Clone, Copy)]
pub struct PercentageFee {
    ratio: Decimal,
}

impl PercentageFee {
    pub fn new(ratio: Decimal) -> Self {
        Self { ratio }
    }
}

impl FeePolicy for PercentageFee {
    fn fee_for(&self, amount: Decimal) -> Option<Decimal> {
        let amount = amount.normalize();
        let ratio = self.ratio.normalize();
        if amount.is_zero() || ratio.is_zero() {
            return Some(Decimal::ZERO);
        }
        let fee = amount.checked_mul(ratio)?;
        // rust_decimal rescales (and rounds) a product it cannot hold
        (fee.scale() == amount.scale() + ratio.scale()).then_some(fee)
    }
}
