use std::{str::FromStr, time::Duration};

use reqwest::{StatusCode, blocking::Client};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateError {
    #[error("Rate request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rate service answered with status {0}")]
    Status(StatusCode),
    #[error("Malformed rate response: {0}")]
    Body(#[from] serde_json::Error),
    #[error("No {coin}/{vs_currency} quote in rate response")]
    MissingQuote { coin: String, vs_currency: String },
    #[error("Unusable quote `{0}`")]
    InvalidQuote(String),
}

/// Source of the base-unit to quote-currency exchange rate.
pub trait RateOracle: Send + Sync {
    fn fetch(&self) -> Result<Decimal, RateError>;
}

/// Constant rate, for offline replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub Decimal);

impl RateOracle for FixedRate {
    fn fetch(&self) -> Result<Decimal, RateError> {
        Ok(self.0)
    }
}

/// Reads the spot price from a CoinGecko `simple/price` endpoint, which
/// answers with `{"<coin>": {"<vs_currency>": <price>}}`.
pub struct CoinGeckoRate {
    client: Client,
    url: String,
    coin: String,
    vs_currency: String,
}

impl CoinGeckoRate {
    pub fn new(
        url: impl Into<String>,
        coin: impl Into<String>,
        vs_currency: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            coin: coin.into(),
            vs_currency: vs_currency.into(),
        })
    }
}

impl RateOracle for CoinGeckoRate {
    fn fetch(&self) -> Result<Decimal, RateError> {
        let response = self.client.get(&self.url).send()?;
        if response.status() != StatusCode::OK {
            return Err(RateError::Status(response.status()));
        }
        let body = response.text()?;
        parse_quote(&body, &self.coin, &self.vs_currency)
    }
}

pub fn parse_quote(body: &str, coin: &str, vs_currency: &str) -> Result<Decimal, RateError> {
    let value: Value = serde_json::from_str(body)?;
    let quote = value
        .get(coin)
        .and_then(|prices| prices.get(vs_currency))
        .filter(|quote| !quote.is_null())
        .ok_or_else(|| RateError::MissingQuote {
            coin: coin.to_owned(),
            vs_currency: vs_currency.to_owned(),
        })?;
    let text = match quote {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(RateError::InvalidQuote(other.to_string())),
    };
    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| RateError::InvalidQuote(text.clone()))?;
    if rate <= Decimal::ZERO {
        return Err(RateError::InvalidQuote(text));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_numeric_quote() {
        let rate = parse_quote(r#"{"bitcoin":{"usd":22882.95}}"#, "bitcoin", "usd").unwrap();
        assert_eq!(rate, dec!(22882.95));
    }

    #[test]
    fn parse_string_quote() {
        let rate = parse_quote(r#"{"bitcoin":{"eur":"21000.5"}}"#, "bitcoin", "eur").unwrap();
        assert_eq!(rate, dec!(21000.5));
    }

    #[test]
    fn missing_or_null_quote() {
        for body in [
            r#"{"bitcoin":{"usd":null}}"#,
            r#"{"bitcoin":{}}"#,
            r#"{"ethereum":{"usd":1}}"#,
        ] {
            let err = parse_quote(body, "bitcoin", "usd").unwrap_err();
            assert!(matches!(err, RateError::MissingQuote { .. }), "{body}");
        }
    }

    #[test]
    fn unusable_quotes() {
        let err = parse_quote(r#"{"bitcoin":{"usd":-3}}"#, "bitcoin", "usd").unwrap_err();
        assert!(matches!(err, RateError::InvalidQuote(_)));
        let err = parse_quote(r#"{"bitcoin":{"usd":"abc"}}"#, "bitcoin", "usd").unwrap_err();
        assert!(matches!(err, RateError::InvalidQuote(_)));
        let err = parse_quote(r#"{"bitcoin":{"usd":[1]}}"#, "bitcoin", "usd").unwrap_err();
        assert!(matches!(err, RateError::InvalidQuote(_)));
    }

    #[test]
    fn malformed_body() {
        let err = parse_quote("<html>rate limited</html>", "bitcoin", "usd").unwrap_err();
        assert!(matches!(err, RateError::Body(_)));
    }

    #[test]
    fn unreachable_service_is_an_error() {
        let oracle = CoinGeckoRate::new(
            "http://127.0.0.1:1/api/v3/simple/price",
            "bitcoin",
            "usd",
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(oracle.fetch().is_err());
    }

    #[test]
    fn fixed_rate() {
        assert_eq!(FixedRate(dec!(30000)).fetch().unwrap(), dec!(30000));
    }
}
