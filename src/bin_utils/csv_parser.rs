use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOp {
    Register,
    Open,
    Transfer,
    Statistics,
}

/// One scripted operation. `actor` is a username, except for `statistics`
/// where it is the admin token; `wallet` and `target` are wallet aliases.
#[derive(Debug, Deserialize)]
pub struct ScriptRow {
    pub op: ScriptOp,
    pub actor: String,
    pub wallet: Option<String>,
    pub target: Option<String>,
    pub amount: Option<Decimal>,
}

/// Parses a ledger script in CSV format, yielding each row with the line it
/// started on.
pub struct CsvScriptParser<R> {
    iter: DeserializeRecordsIntoIter<R, ScriptRow>,
}

impl<R> CsvScriptParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvScriptParser<R>
where
    R: Read,
{
    type Item = (u64, Result<ScriptRow, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_script_rows() {
        let script = "op,actor,wallet,target,amount\n\
                      register, alice,,,\n\
                      transfer,alice,w1,w2,0.5\n\
                      withdraw,alice,,,\n";
        let rows: Vec<_> = CsvScriptParser::new(script.as_bytes()).collect();
        assert_eq!(rows.len(), 3);

        let register = rows[0].1.as_ref().unwrap();
        assert_eq!(register.op, ScriptOp::Register);
        assert_eq!(register.actor, "alice");
        assert_eq!(register.wallet, None);
        assert_eq!(register.amount, None);

        let transfer = rows[1].1.as_ref().unwrap();
        assert_eq!(transfer.op, ScriptOp::Transfer);
        assert_eq!(transfer.wallet.as_deref(), Some("w1"));
        assert_eq!(transfer.target.as_deref(), Some("w2"));
        assert_eq!(transfer.amount, Some(dec!(0.5)));

        assert!(rows[2].1.is_err());
    }
}
