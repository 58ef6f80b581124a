use rust_decimal::Decimal;
use thiserror::Error;
use tracing::error;

use crate::{
    command::TransferCommandError,
    repository::StorageError,
    transaction::{Statistics, Transaction},
    wallet::{BalanceError, WalletInfo},
};

pub mod ledger_engine;
pub mod locks;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Username already taken")]
    UsernameInUse,
    #[error("User could not be stored")]
    Persistence,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateWalletError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Wallet platform limit of {max} exceeded")]
    WalletLimitExceeded { max: usize },
    #[error("Rate fetch failed")]
    RateUnavailable,
    #[error("Wallet could not be stored")]
    Persistence,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GetWalletError {
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Rate fetch failed")]
    RateUnavailable,
    #[error("Wallet could not be loaded")]
    Persistence,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error(transparent)]
    Command(#[from] TransferCommandError),
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Wallet balance insufficient to perform the transaction: {required} required, {available} available")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
    #[error("Transfer would overflow a wallet balance")]
    BalanceOverflow,
    #[error("Fee for {amount} cannot be represented exactly")]
    FeeNotRepresentable { amount: Decimal },
    #[error("Transfer could not be committed")]
    Persistence,
}

impl From<BalanceError> for TransferError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Insufficient {
                required,
                available,
            } => Self::InsufficientBalance {
                required,
                available,
            },
            BalanceError::Overflow => Self::BalanceOverflow,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("Transactions could not be loaded")]
    Persistence,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatisticsError {
    #[error("You have to be an admin to view the platform statistics")]
    Unauthorized,
    #[error("Platform profit exceeds the representable range")]
    ProfitOverflow,
    #[error("Transactions could not be loaded")]
    Persistence,
}

// Storage details are logged here and stay out of the operation results.
macro_rules! persistence_from_storage {
    ($($err:ty),+ $(,)?) => {
        $(
            impl From<StorageError> for $err {
                fn from(err: StorageError) -> Self {
                    error!(%err, "storage failure");
                    Self::Persistence
                }
            }
        )+
    };
}

persistence_from_storage!(
    RegisterError,
    CreateWalletError,
    GetWalletError,
    TransferError,
    QueryError,
    StatisticsError,
);

/// Limits applied when opening wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletPolicy {
    pub max_wallets_per_user: usize,
    pub initial_deposit: Decimal,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        Self {
            max_wallets_per_user: 3,
            initial_deposit: Decimal::ONE,
        }
    }
}

/// Everything the custodial wallet service offers to its callers. Each
/// operation either fully succeeds or fails before changing any state.
///
/// NOTE: [`ledger_engine::LedgerEngine`] is the only implementation; the
/// trait is the seam a request-handling layer programs against.
pub trait WalletService {
    /// Returns the new user's bearer token.
    fn register(&self, username: &str) -> Result<String, RegisterError>;

    fn create_wallet(&self, user_token: &str) -> Result<WalletInfo, CreateWalletError>;

    fn get_wallet(&self, address: &str, user_token: &str) -> Result<WalletInfo, GetWalletError>;

    fn transfer(
        &self,
        from_address: &str,
        to_address: &str,
        user_token: &str,
        amount: Decimal,
    ) -> Result<Transaction, TransferError>;

    fn transactions_for_user(&self, user_token: &str) -> Result<Vec<Transaction>, QueryError>;

    fn transactions_for_wallet(
        &self,
        address: &str,
        user_token: &str,
    ) -> Result<Vec<Transaction>, QueryError>;

    fn statistics(&self, admin_token: &str) -> Result<Statistics, StatisticsError>;
}
