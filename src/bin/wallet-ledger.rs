use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use wallet_ledger::{
    bin_utils::{ReplayError, Service, logging::init_logging},
    config::{CONFIG_PATH_ENV, LedgerConfig},
};

fn main() -> Result<()> {
    init_logging("info");

    let filename = std::env::args()
        .nth(1)
        .context("Expected a script file name as the first argument")?;
    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = LedgerConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, err| {
            match err {
                ReplayError::Script(err) => {
                    eprintln!("Error at line {line}: {err}")
                }
                // ledger rejections are expected outcomes, not script mistakes
                err => tracing::warn!(line, %err, "operation rejected"),
            }
        }),
    };
    service.run()
}
