use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    auth::{AdminAuthority, RandomHexTokens, StaticAdminToken, TokenIssuer},
    command::TransferCommand,
    config::LedgerConfig,
    fee::{FeePolicy, PercentageFee},
    rate::{RateError, RateOracle},
    repository::{LedgerStore, TransferBatch},
    transaction::{Statistics, Transaction},
    user::User,
    wallet::{Wallet, WalletInfo},
};

use super::{
    CreateWalletError, GetWalletError, QueryError, RegisterError, StatisticsError, TransferError,
    WalletPolicy, WalletService, locks::KeyedLocks,
};

/// External capabilities the engine depends on.
pub struct Collaborators {
    pub fees: Box<dyn FeePolicy>,
    pub rates: Box<dyn RateOracle>,
    pub tokens: Box<dyn TokenIssuer>,
    pub admin: Box<dyn AdminAuthority>,
}

pub struct LedgerEngine<S> {
    store: S,
    fees: Box<dyn FeePolicy>,
    rates: Box<dyn RateOracle>,
    tokens: Box<dyn TokenIssuer>,
    admin: Box<dyn AdminAuthority>,
    policy: WalletPolicy,
    wallet_locks: KeyedLocks,
    owner_locks: KeyedLocks,
}

impl<S> LedgerEngine<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, collaborators: Collaborators, policy: WalletPolicy) -> Self {
        let Collaborators {
            fees,
            rates,
            tokens,
            admin,
        } = collaborators;
        Self {
            store,
            fees,
            rates,
            tokens,
            admin,
            policy,
            wallet_locks: KeyedLocks::default(),
            owner_locks: KeyedLocks::default(),
        }
    }

    pub fn from_config(store: S, config: &LedgerConfig) -> Result<Self, RateError> {
        let collaborators = Collaborators {
            fees: Box::new(PercentageFee::new(config.fee.ratio)),
            rates: config.rate.build_oracle()?,
            tokens: Box::new(RandomHexTokens::new(config.auth.token_bytes)),
            admin: Box::new(StaticAdminToken::new(config.auth.admin_token.clone())),
        };
        let policy = WalletPolicy {
            max_wallets_per_user: config.wallet.max_per_user,
            initial_deposit: config.wallet.initial_deposit,
        };
        Ok(Self::new(store, collaborators, policy))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn current_rate(&self) -> Option<Decimal> {
        match self.rates.fetch() {
            Ok(rate) => Some(rate),
            Err(err) => {
                warn!(%err, "exchange rate unavailable");
                None
            }
        }
    }
}

impl<S> WalletService for LedgerEngine<S>
where
    S: LedgerStore,
{
    fn register(&self, username: &str) -> Result<String, RegisterError> {
        if self.store.username_taken(username)? {
            debug!(username, "username already registered");
            return Err(RegisterError::UsernameInUse);
        }
        let token = self.tokens.issue();
        // a concurrent registration of the same name is rejected here by the
        // store and reported as a persistence failure
        self.store.create_user(User::new(username, token.clone()))?;
        info!(username, "user registered");
        Ok(token)
    }

    fn create_wallet(&self, user_token: &str) -> Result<WalletInfo, CreateWalletError> {
        let Some(user) = self.store.get_user(user_token)? else {
            debug!("wallet creation with unknown token");
            return Err(CreateWalletError::Unauthorized);
        };

        // held until the wallet is stored, so the count cannot go stale
        let _owner = self.owner_locks.lock(user_token);
        let owned = self.store.wallets_by_owner(user_token)?.len();
        let max = self.policy.max_wallets_per_user;
        if owned >= max {
            debug!(username = %user.username, owned, "wallet limit reached");
            return Err(CreateWalletError::WalletLimitExceeded { max });
        }

        let rate = self
            .current_rate()
            .ok_or(CreateWalletError::RateUnavailable)?;
        let wallet = Wallet::new(
            self.tokens.issue(),
            user_token.to_owned(),
            self.policy.initial_deposit,
        );
        let wallet_info = wallet.info(rate).ok_or_else(|| {
            warn!(%rate, "quote conversion overflow");
            CreateWalletError::RateUnavailable
        })?;

        self.store.create_wallet(wallet)?;
        info!(
            username = %user.username,
            address = %wallet_info.address,
            balance = %wallet_info.balance,
            "wallet created"
        );
        Ok(wallet_info)
    }

    fn get_wallet(&self, address: &str, user_token: &str) -> Result<WalletInfo, GetWalletError> {
        let wallet = self
            .store
            .get_wallet(address)?
            .ok_or(GetWalletError::WalletNotFound)?;
        if !wallet.is_owned_by(user_token) {
            debug!(address, "wallet lookup by non-owner");
            return Err(GetWalletError::Unauthorized);
        }
        let rate = self.current_rate().ok_or(GetWalletError::RateUnavailable)?;
        wallet.info(rate).ok_or_else(|| {
            warn!(%rate, address, "quote conversion overflow");
            GetWalletError::RateUnavailable
        })
    }

    fn transfer(
        &self,
        from_address: &str,
        to_address: &str,
        user_token: &str,
        amount: Decimal,
    ) -> Result<Transaction, TransferError> {
        let command = TransferCommand::parse(from_address, to_address, amount)?;

        // wallets are never removed, so unknown addresses can be turned away
        // before they take a slot in the lock table
        for address in command.lock_order() {
            if self.store.get_wallet(address)?.is_none() {
                debug!(address, "transfer with unknown wallet");
                return Err(TransferError::WalletNotFound);
            }
        }

        // balances read below stay current until the batch is committed
        let _guards = self.wallet_locks.lock_all(command.lock_order());

        let source = self.store.get_wallet(&command.from_address)?;
        let destination = self.store.get_wallet(&command.to_address)?;
        let (Some(source), Some(destination)) = (source, destination) else {
            debug!(from = from_address, to = to_address, "transfer with unknown wallet");
            return Err(TransferError::WalletNotFound);
        };

        if !source.is_owned_by(user_token) {
            debug!(from = from_address, "transfer by non-owner");
            return Err(TransferError::Unauthorized);
        }

        let fee = if source.shares_owner_with(&destination) {
            Decimal::ZERO
        } else {
            self.fees
                .fee_for(command.amount)
                .ok_or(TransferError::FeeNotRepresentable {
                    amount: command.amount,
                })?
        };

        let debit = source
            .handle_debit(command.amount, fee)
            .inspect_err(|err| debug!(from = from_address, %err, "transfer rejected"))?;
        let credit = destination.handle_credit(command.amount)?;

        let entry = Transaction {
            from_address: command.from_address,
            to_address: command.to_address,
            fee,
            amount: command.amount,
        };
        self.store.commit_transfer(TransferBatch {
            debit,
            credit,
            entry: entry.clone(),
        })?;

        info!(
            from = %entry.from_address,
            to = %entry.to_address,
            amount = %entry.amount,
            fee = %entry.fee,
            "transfer committed"
        );
        Ok(entry)
    }

    fn transactions_for_user(&self, user_token: &str) -> Result<Vec<Transaction>, QueryError> {
        if self.store.get_user(user_token)?.is_none() {
            return Err(QueryError::Unauthorized);
        }
        Ok(self.store.transactions_by_owner(user_token)?)
    }

    fn transactions_for_wallet(
        &self,
        address: &str,
        user_token: &str,
    ) -> Result<Vec<Transaction>, QueryError> {
        let wallet = self
            .store
            .get_wallet(address)?
            .ok_or(QueryError::WalletNotFound)?;
        if !wallet.is_owned_by(user_token) {
            return Err(QueryError::Unauthorized);
        }
        Ok(self.store.transactions_by_wallet(address)?)
    }

    fn statistics(&self, admin_token: &str) -> Result<Statistics, StatisticsError> {
        if !self.admin.is_admin(admin_token) {
            debug!("statistics requested without admin token");
            return Err(StatisticsError::Unauthorized);
        }
        Statistics::from_log(&self.store.all_transactions()?).ok_or_else(|| {
            warn!("platform profit overflow");
            StatisticsError::ProfitOverflow
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        rate::FixedRate,
        repository::{
            StorageError, TransactionLog, UserRepository, WalletRepository,
            in_memory::InMemoryStore,
        },
    };

    use crate::wallet::{WalletEvent, WalletEventKind};

    use super::*;

    struct NoRate;

    impl RateOracle for NoRate {
        fn fetch(&self) -> Result<Decimal, RateError> {
            Err(RateError::InvalidQuote("null".into()))
        }
    }

    /// Store that lies about username availability and can lose owners,
    /// as a store shared with other writers would.
    #[derive(Default)]
    struct RacingStore {
        inner: InMemoryStore,
        owners_vanish: bool,
    }

    impl UserRepository for RacingStore {
        fn create_user(&self, user: User) -> Result<(), StorageError> {
            self.inner.create_user(user)
        }

        fn get_user(&self, token: &str) -> Result<Option<User>, StorageError> {
            self.inner.get_user(token)
        }

        fn username_taken(&self, _username: &str) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    impl WalletRepository for RacingStore {
        fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, StorageError> {
            self.inner.get_wallet(address)
        }

        fn wallets_by_owner(&self, owner_token: &str) -> Result<Vec<Wallet>, StorageError> {
            self.inner.wallets_by_owner(owner_token)
        }

        fn create_wallet(&self, wallet: Wallet) -> Result<(), StorageError> {
            if self.owners_vanish {
                return Err(StorageError::UnknownOwner);
            }
            self.inner.create_wallet(wallet)
        }

        fn commit_transfer(&self, batch: TransferBatch) -> Result<(), StorageError> {
            self.inner.commit_transfer(batch)
        }
    }

    impl TransactionLog for RacingStore {
        fn transactions_by_wallet(&self, address: &str) -> Result<Vec<Transaction>, StorageError> {
            self.inner.transactions_by_wallet(address)
        }

        fn transactions_by_owner(
            &self,
            owner_token: &str,
        ) -> Result<Vec<Transaction>, StorageError> {
            self.inner.transactions_by_owner(owner_token)
        }

        fn all_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
            self.inner.all_transactions()
        }
    }

    fn engine_with<S: LedgerStore>(store: S, rates: Box<dyn RateOracle>) -> LedgerEngine<S> {
        LedgerEngine::new(
            store,
            Collaborators {
                fees: Box::new(PercentageFee::new(dec!(0.015))),
                rates,
                tokens: Box::new(RandomHexTokens::new(32)),
                admin: Box::new(StaticAdminToken::new("admin")),
            },
            WalletPolicy::default(),
        )
    }

    #[test]
    fn duplicate_registration_rejected_by_store_is_persistence_failure() {
        let engine = engine_with(RacingStore::default(), Box::new(FixedRate(dec!(1))));
        engine.register("alice").unwrap();
        assert_eq!(engine.register("alice"), Err(RegisterError::Persistence));
    }

    #[test]
    fn duplicate_registration_is_username_in_use() {
        let engine = engine_with(InMemoryStore::new(), Box::new(FixedRate(dec!(1))));
        engine.register("alice").unwrap();
        assert_eq!(engine.register("alice"), Err(RegisterError::UsernameInUse));
    }

    #[test]
    fn wallet_lost_owner_is_persistence_failure() {
        let store = RacingStore {
            owners_vanish: true,
            ..Default::default()
        };
        let engine = engine_with(store, Box::new(FixedRate(dec!(1))));
        let token = engine.register("alice").unwrap();
        assert_eq!(
            engine.create_wallet(&token),
            Err(CreateWalletError::Persistence)
        );
        assert!(engine.store().wallets_by_owner(&token).unwrap().is_empty());
    }

    #[test]
    fn rate_failure_creates_nothing() {
        let engine = engine_with(InMemoryStore::new(), Box::new(NoRate));
        let token = engine.register("alice").unwrap();
        assert_eq!(
            engine.create_wallet(&token),
            Err(CreateWalletError::RateUnavailable)
        );
        assert!(engine.store().wallets_by_owner(&token).unwrap().is_empty());
    }

    #[test]
    fn rate_is_fetched_after_lookup_checks() {
        let store = InMemoryStore::new();
        store.create_user(User::new("alice", "ta")).unwrap();
        store
            .create_wallet(Wallet::new("w1".into(), "ta".into(), dec!(1)))
            .unwrap();
        let engine = engine_with(store, Box::new(NoRate));

        assert_eq!(
            engine.get_wallet("w1", "ta"),
            Err(GetWalletError::RateUnavailable)
        );
        assert_eq!(
            engine.get_wallet("nope", "ta"),
            Err(GetWalletError::WalletNotFound)
        );
        assert_eq!(
            engine.get_wallet("w1", "tb"),
            Err(GetWalletError::Unauthorized)
        );
    }

    #[test]
    fn limit_is_checked_before_rate() {
        let store = InMemoryStore::new();
        store.create_user(User::new("alice", "ta")).unwrap();
        for address in ["w1", "w2", "w3"] {
            store
                .create_wallet(Wallet::new(address.into(), "ta".into(), dec!(1)))
                .unwrap();
        }
        let engine = engine_with(store, Box::new(NoRate));
        assert_eq!(
            engine.create_wallet("ta"),
            Err(CreateWalletError::WalletLimitExceeded { max: 3 })
        );
    }

    #[test]
    fn unknown_wallets_never_enter_lock_table() {
        let engine = engine_with(InMemoryStore::new(), Box::new(FixedRate(dec!(1))));
        let token = engine.register("alice").unwrap();
        let wallet = engine.create_wallet(&token).unwrap().address;

        for i in 0..100 {
            let from = format!("ghost-a-{i}");
            let to = format!("ghost-b-{i}");
            assert_eq!(
                engine.transfer(&from, &to, "nobody", dec!(1)),
                Err(TransferError::WalletNotFound)
            );
            assert_eq!(
                engine.transfer(&wallet, &to, &token, dec!(0.1)),
                Err(TransferError::WalletNotFound)
            );
        }
        assert!(engine.wallet_locks.is_empty());
    }

    #[test]
    fn unrepresentable_fee_aborts_transfer() {
        let engine = LedgerEngine::new(
            InMemoryStore::new(),
            Collaborators {
                fees: Box::new(PercentageFee::new(Decimal::new(1, 28))),
                rates: Box::new(FixedRate(dec!(1))),
                tokens: Box::new(RandomHexTokens::new(32)),
                admin: Box::new(StaticAdminToken::new("admin")),
            },
            WalletPolicy::default(),
        );
        let alice = engine.register("alice").unwrap();
        let bob = engine.register("bob").unwrap();
        let from = engine.create_wallet(&alice).unwrap().address;
        let to = engine.create_wallet(&bob).unwrap().address;

        assert_eq!(
            engine.transfer(&from, &to, &alice, dec!(0.5)),
            Err(TransferError::FeeNotRepresentable { amount: dec!(0.5) })
        );
        assert!(engine.store().all_transactions().unwrap().is_empty());
        assert_eq!(engine.get_wallet(&from, &alice).unwrap().balance, dec!(1));
    }

    #[test]
    fn profit_overflow_is_reported() {
        let store = InMemoryStore::new();
        store.create_user(User::new("alice", "ta")).unwrap();
        store.create_user(User::new("bob", "tb")).unwrap();
        store
            .create_wallet(Wallet::new("w1".into(), "ta".into(), Decimal::MAX))
            .unwrap();
        store
            .create_wallet(Wallet::new("w2".into(), "tb".into(), Decimal::ZERO))
            .unwrap();
        // written straight to the log; no real transfer can carry such fees
        for fee in [Decimal::MAX, Decimal::ONE] {
            let debit = WalletEvent {
                address: "w1".into(),
                expected_balance: store.get_wallet("w1").unwrap().unwrap().balance,
                kind: WalletEventKind::Debited {
                    amount: Decimal::ZERO,
                    fee,
                },
            };
            let credit = WalletEvent {
                address: "w2".into(),
                expected_balance: Decimal::ZERO,
                kind: WalletEventKind::Credited {
                    amount: Decimal::ZERO,
                },
            };
            let entry = Transaction {
                from_address: "w1".into(),
                to_address: "w2".into(),
                fee,
                amount: Decimal::ZERO,
            };
            store
                .commit_transfer(TransferBatch {
                    debit,
                    credit,
                    entry,
                })
                .unwrap();
        }

        let engine = engine_with(store, Box::new(FixedRate(dec!(1))));
        assert_eq!(
            engine.statistics("admin"),
            Err(StatisticsError::ProfitOverflow)
        );
    }

    #[test]
    fn statistics_need_admin() {
        let engine = engine_with(InMemoryStore::new(), Box::new(FixedRate(dec!(1))));
        assert_eq!(engine.statistics("guest"), Err(StatisticsError::Unauthorized));
        assert_eq!(engine.statistics("admin"), Ok(Statistics::default()));
    }
}
