use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::{transaction::Transaction, user::User, wallet::Wallet};

use super::{StorageError, TransactionLog, TransferBatch, UserRepository, WalletRepository};

#[derive(Default)]
struct LedgerState {
    users: HashMap<String, User>,
    usernames: HashSet<String>,
    wallets: HashMap<String, Wallet>,
    // owner token -> addresses, in creation order
    owned: HashMap<String, Vec<String>>,
    log: Vec<Transaction>,
}

/// Process-local store. A single lock guards all tables, so every write,
/// including a whole [`TransferBatch`], is observed either completely or
/// not at all.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<LedgerState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryStore {
    fn create_user(&self, user: User) -> Result<(), StorageError> {
        let mut state = self.state.write();
        if state.usernames.contains(&user.username) {
            return Err(StorageError::DuplicateUsername(user.username));
        }
        if state.users.contains_key(&user.token) {
            return Err(StorageError::DuplicateToken);
        }
        state.usernames.insert(user.username.clone());
        state.users.insert(user.token.clone(), user);
        Ok(())
    }

    fn get_user(&self, token: &str) -> Result<Option<User>, StorageError> {
        Ok(self.state.read().users.get(token).cloned())
    }

    fn username_taken(&self, username: &str) -> Result<bool, StorageError> {
        Ok(self.state.read().usernames.contains(username))
    }
}

impl WalletRepository for InMemoryStore {
    fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, StorageError> {
        Ok(self.state.read().wallets.get(address).cloned())
    }

    fn wallets_by_owner(&self, owner_token: &str) -> Result<Vec<Wallet>, StorageError> {
        let state = self.state.read();
        let Some(addresses) = state.owned.get(owner_token) else {
            return Ok(Vec::new());
        };
        Ok(addresses
            .iter()
            .filter_map(|address| state.wallets.get(address).cloned())
            .collect())
    }

    fn create_wallet(&self, wallet: Wallet) -> Result<(), StorageError> {
        let mut state = self.state.write();
        if !state.users.contains_key(&wallet.owner_token) {
            return Err(StorageError::UnknownOwner);
        }
        if state.wallets.contains_key(&wallet.address) {
            return Err(StorageError::DuplicateAddress(wallet.address));
        }
        state
            .owned
            .entry(wallet.owner_token.clone())
            .or_default()
            .push(wallet.address.clone());
        state.wallets.insert(wallet.address.clone(), wallet);
        Ok(())
    }

    fn commit_transfer(&self, batch: TransferBatch) -> Result<(), StorageError> {
        let mut state = self.state.write();
        // validate everything before touching anything
        for event in [&batch.debit, &batch.credit] {
            let wallet = state
                .wallets
                .get(&event.address)
                .ok_or_else(|| StorageError::UnknownWallet(event.address.clone()))?;
            if wallet.balance != event.expected_balance {
                return Err(StorageError::BalanceConflict(event.address.clone()));
            }
        }
        for event in [&batch.debit, &batch.credit] {
            if let Some(wallet) = state.wallets.get_mut(&event.address) {
                wallet.apply(event);
            }
        }
        state.log.push(batch.entry);
        Ok(())
    }
}

impl TransactionLog for InMemoryStore {
    fn transactions_by_wallet(&self, address: &str) -> Result<Vec<Transaction>, StorageError> {
        Ok(self
            .state
            .read()
            .log
            .iter()
            .filter(|tx| tx.touches(address))
            .cloned()
            .collect())
    }

    fn transactions_by_owner(&self, owner_token: &str) -> Result<Vec<Transaction>, StorageError> {
        let state = self.state.read();
        let Some(addresses) = state.owned.get(owner_token) else {
            return Ok(Vec::new());
        };
        Ok(state
            .log
            .iter()
            .filter(|tx| addresses.iter().any(|address| tx.touches(address)))
            .cloned()
            .collect())
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
        Ok(self.state.read().log.clone())
    }
}
