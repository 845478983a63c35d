// Runtime settings shared by the CLI, the dashboard and the API server

use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_LEDGER_PATH: &str = "expenses.csv";

/// Ledger location and monthly budget.
///
/// Flattened into each binary's argument parser; every flag also reads an
/// environment variable.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Path of the ledger CSV file.
    #[arg(long, global = true, env = "EXPENSE_LEDGER", default_value = DEFAULT_LEDGER_PATH)]
    pub ledger: PathBuf,

    /// Monthly budget; 0 disables the budget alert.
    #[arg(long, global = true, env = "EXPENSE_BUDGET", default_value_t = 0.0, value_parser = parse_budget)]
    pub budget: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ledger: PathBuf::from(DEFAULT_LEDGER_PATH),
            budget: 0.0,
        }
    }
}

/// Accepts any finite, non-negative number.
pub fn parse_budget(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("budget must be a non-negative number, got {raw}"));
    }
    Ok(value)
}

/// Accepts any finite number, negative included (refunds).
pub fn parse_amount_arg(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("amount must be a finite number, got {raw}"));
    }
    Ok(value)
}
