/// Registered users and their bearer tokens.
pub mod user;

/// Wallet balances. Balance changes are events, created by validating a
/// debit or credit against the current balance and applied by storage.
pub mod wallet;

/// Immutable transfer log entries and statistics over them.
pub mod transaction;

/// Transfer requests, validated before any wallet is looked up.
pub mod command;

/// Transfer fees charged between wallets of different owners.
pub mod fee;

/// Exchange rate sources. A failed fetch is an ordinary outcome.
pub mod rate;

/// Token issuing and admin token validation.
pub mod auth;

/// Storage contracts the engine depends on, plus an "in memory" backend.
///
/// NOTE: a SQL backend only has to implement these traits; the transfer
/// batch maps onto one database transaction.
pub mod repository;

/// The ledger engine: authorization, wallet limits, fees and atomic
/// transfers on top of [`repository`].
pub mod engine;

/// Layered configuration: built-in defaults, an optional file, then environment.
pub mod config;

/// Script replay harness behind the `wallet-ledger` binary. It lives in the
/// library so integration tests can drive it too.
pub mod bin_utils;
