use thiserror::Error;

use crate::{
    transaction::Transaction,
    user::User,
    wallet::{Wallet, WalletEvent},
};

pub mod in_memory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Username `{0}` is already registered")]
    DuplicateUsername(String),
    #[error("User token is already registered")]
    DuplicateToken,
    #[error("Wallet `{0}` already exists")]
    DuplicateAddress(String),
    #[error("Wallet owner is not a registered user")]
    UnknownOwner,
    #[error("Wallet `{0}` does not exist")]
    UnknownWallet(String),
    #[error("Balance of wallet `{0}` changed concurrently")]
    BalanceConflict(String),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Everything one transfer writes: the two balance mutations and the log
/// entry. Committed as one unit or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBatch {
    pub debit: WalletEvent,
    pub credit: WalletEvent,
    pub entry: Transaction,
}

pub trait UserRepository: Send + Sync {
    /// Fails with [`StorageError::DuplicateUsername`] or
    /// [`StorageError::DuplicateToken`] when either key is taken.
    fn create_user(&self, user: User) -> Result<(), StorageError>;

    fn get_user(&self, token: &str) -> Result<Option<User>, StorageError>;

    fn username_taken(&self, username: &str) -> Result<bool, StorageError>;
}

pub trait WalletRepository: Send + Sync {
    fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, StorageError>;

    /// Wallets of one owner, in creation order.
    fn wallets_by_owner(&self, owner_token: &str) -> Result<Vec<Wallet>, StorageError>;

    fn create_wallet(&self, wallet: Wallet) -> Result<(), StorageError>;

    /// Applies both balance events and appends the log entry atomically.
    /// Each event is applied only if the wallet still holds
    /// `expected_balance`; otherwise nothing is written.
    fn commit_transfer(&self, batch: TransferBatch) -> Result<(), StorageError>;
}

/// Append-only transfer history. Appends happen through
/// [`WalletRepository::commit_transfer`]; all queries return entries in
/// insertion order.
pub trait TransactionLog: Send + Sync {
    fn transactions_by_wallet(&self, address: &str) -> Result<Vec<Transaction>, StorageError>;

    /// Entries where the owner holds either side.
    fn transactions_by_owner(&self, owner_token: &str) -> Result<Vec<Transaction>, StorageError>;

    fn all_transactions(&self) -> Result<Vec<Transaction>, StorageError>;
}

/// One backend serving users, wallets and the log, which a transfer needs
/// to commit atomically.
pub trait LedgerStore: UserRepository + WalletRepository + TransactionLog {}

impl<T> LedgerStore for T where T: UserRepository + WalletRepository + TransactionLog {}
