use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::rate::{CoinGeckoRate, FixedRate, RateError, RateOracle};

/// Environment variable naming an optional configuration file.
pub const CONFIG_PATH_ENV: &str = "WALLET_LEDGER_CONFIG";

/// Prefix of environment overrides, e.g. `WALLET_LEDGER__FEE__RATIO`.
pub const ENV_PREFIX: &str = "WALLET_LEDGER";

const DEFAULT_RATE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd&precision=full";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    pub wallet: WalletSettings,
    pub fee: FeeSettings,
    pub auth: AuthSettings,
    pub rate: RateSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletSettings {
    pub max_per_user: usize,
    pub initial_deposit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeeSettings {
    pub ratio: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSettings {
    pub token_bytes: usize,
    /// Empty disables statistics access.
    pub admin_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateSettings {
    pub url: String,
    pub coin: String,
    pub vs_currency: String,
    pub timeout_secs: u64,
    /// When set, no HTTP requests are made and this rate is used.
    #[serde(default)]
    pub fixed: Option<Decimal>,
}

impl LedgerConfig {
    /// Built-in defaults, then the file at `path` (if any), then
    /// `WALLET_LEDGER__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("wallet.max_per_user", 3)?
            .set_default("wallet.initial_deposit", "1")?
            .set_default("fee.ratio", "0.015")?
            .set_default("auth.token_bytes", 32)?
            .set_default("auth.admin_token", "")?
            .set_default("rate.url", DEFAULT_RATE_URL)?
            .set_default("rate.coin", "bitcoin")?
            .set_default("rate.vs_currency", "usd")?
            .set_default("rate.timeout_secs", 10)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee.ratio < Decimal::ZERO || self.fee.ratio >= Decimal::ONE {
            return Err(invalid(format!(
                "fee.ratio must be in [0, 1), got {}",
                self.fee.ratio
            )));
        }
        if self.wallet.initial_deposit < Decimal::ZERO {
            return Err(invalid(format!(
                "wallet.initial_deposit must not be negative, got {}",
                self.wallet.initial_deposit
            )));
        }
        if self.wallet.max_per_user == 0 {
            return Err(invalid("wallet.max_per_user must be at least 1".to_string()));
        }
        if self.auth.token_bytes < 16 {
            return Err(invalid(format!(
                "auth.token_bytes must be at least 16, got {}",
                self.auth.token_bytes
            )));
        }
        if let Some(rate) = self.rate.fixed {
            if rate <= Decimal::ZERO {
                return Err(invalid(format!("rate.fixed must be positive, got {rate}")));
            }
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            wallet: WalletSettings {
                max_per_user: 3,
                initial_deposit: Decimal::ONE,
            },
            fee: FeeSettings {
                ratio: Decimal::new(15, 3),
            },
            auth: AuthSettings {
                token_bytes: 32,
                admin_token: String::new(),
            },
            rate: RateSettings {
                url: DEFAULT_RATE_URL.to_string(),
                coin: "bitcoin".to_string(),
                vs_currency: "usd".to_string(),
                timeout_secs: 10,
                fixed: None,
            },
        }
    }
}

impl RateSettings {
    pub fn build_oracle(&self) -> Result<Box<dyn RateOracle>, RateError> {
        if let Some(rate) = self.fixed {
            return Ok(Box::new(FixedRate(rate)));
        }
        Ok(Box::new(CoinGeckoRate::new(
            self.url.clone(),
            self.coin.clone(),
            self.vs_currency.clone(),
            Duration::from_secs(self.timeout_secs),
        )?))
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Message(message)
}
