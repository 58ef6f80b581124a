//! Replays a CSV script of ledger operations. Users and wallets are named by
//! aliases in the script; the engine's tokens and addresses never appear in it.

use std::{
    collections::{BTreeMap, HashMap},
    io::{Read, Write},
};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::{
    config::LedgerConfig,
    engine::{
        CreateWalletError, RegisterError, StatisticsError, TransferError, WalletService,
        ledger_engine::LedgerEngine,
    },
    repository::in_memory::InMemoryStore,
};
use csv_parser::{CsvScriptParser, ScriptOp, ScriptRow};
use csv_printer::{WalletRow, print_wallets};
pub mod csv_parser;
pub mod csv_printer;
pub mod logging;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("{op:?} requires the `{field}` column")]
    MissingField { op: ScriptOp, field: &'static str },
    #[error("Unknown user `{0}`")]
    UnknownUser(String),
    #[error("Wallet alias `{0}` is already in use")]
    DuplicateAlias(String),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    CreateWallet(#[from] CreateWalletError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Statistics(#[from] StatisticsError),
}

/// Replays a CSV ledger script against a fresh in-memory engine and prints
/// the final state of every opened wallet.
pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    pub error_printer: Box<dyn FnMut(u64, ReplayError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let engine = LedgerEngine::from_config(InMemoryStore::new(), &self.config)
            .context("Failed to set up the exchange rate source")?;
        let parser = CsvScriptParser::new(self.input);

        let mut aliases = Aliases::default();

        for (line, row) in parser {
            let replayed = row
                .map_err(|err| ReplayError::from(ScriptError::from(err)))
                .and_then(|row| aliases.replay(&engine, row));
            if let Err(err) = replayed {
                (self.error_printer)(line, err);
            }
        }

        let mut rows = Vec::with_capacity(aliases.wallets.len());
        for (alias, opened) in &aliases.wallets {
            let token = aliases.token_of(&opened.owner)?;
            let wallet = engine
                .get_wallet(&opened.address, token)
                .with_context(|| format!("Failed to read wallet `{alias}`"))?;
            rows.push(WalletRow {
                wallet: alias.clone(),
                owner: opened.owner.clone(),
                balance: wallet.balance,
                balance_in_quote: wallet.balance_in_quote,
            });
        }
        print_wallets(self.output, rows)
    }
}

struct OpenedWallet {
    address: String,
    owner: String,
}

/// Script names mapped to the tokens and addresses the engine issued.
#[derive(Default)]
struct Aliases {
    users: HashMap<String, String>,
    wallets: BTreeMap<String, OpenedWallet>,
}

impl Aliases {
    fn replay<S>(&mut self, engine: &S, row: ScriptRow) -> Result<(), ReplayError>
    where
        S: WalletService,
    {
        match row.op {
            ScriptOp::Register => {
                let token = engine.register(&row.actor)?;
                self.users.insert(row.actor, token);
            }
            ScriptOp::Open => {
                let alias = required(row.wallet, row.op, "wallet")?;
                if self.wallets.contains_key(&alias) {
                    return Err(ScriptError::DuplicateAlias(alias).into());
                }
                let wallet = engine.create_wallet(self.token_of(&row.actor)?)?;
                self.wallets.insert(
                    alias,
                    OpenedWallet {
                        address: wallet.address,
                        owner: row.actor,
                    },
                );
            }
            ScriptOp::Transfer => {
                let from = required(row.wallet, row.op, "wallet")?;
                let to = required(row.target, row.op, "target")?;
                let amount: Decimal = required(row.amount, row.op, "amount")?;
                engine.transfer(
                    self.address_of(&from),
                    self.address_of(&to),
                    self.token_of(&row.actor)?,
                    amount,
                )?;
            }
            ScriptOp::Statistics => {
                let stats = engine.statistics(&row.actor)?;
                info!(
                    profit = %stats.profit,
                    transactions = stats.transaction_count,
                    "platform statistics"
                );
            }
        }
        Ok(())
    }

    fn token_of(&self, username: &str) -> Result<&str, ScriptError> {
        self.users
            .get(username)
            .map(String::as_str)
            .ok_or_else(|| ScriptError::UnknownUser(username.to_owned()))
    }

    // unknown aliases pass through as raw addresses
    fn address_of<'a>(&'a self, alias: &'a str) -> &'a str {
        self.wallets
            .get(alias)
            .map_or(alias, |opened| opened.address.as_str())
    }
}

fn required<T>(value: Option<T>, op: ScriptOp, field: &'static str) -> Result<T, ScriptError> {
    value.ok_or(ScriptError::MissingField { op, field })
}
