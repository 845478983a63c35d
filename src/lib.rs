// Expense Ledger - Core Library
// Exposes the ledger pipeline for the CLI, the dashboard, the API server and tests

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod export;
pub mod normalize;
pub mod parser;
pub mod record;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use aggregate::{
    available_categories, available_months, budget_status, budget_usage, category_breakdown,
    daily_trend, filter, month_key, top_category, total_amount, BudgetStatus, Selection, Summary,
};
pub use config::Settings;
pub use errors::{FormError, ImportError, LedgerError};
pub use export::{export_xlsx, write_report, EXPORT_FILE_NAME};
pub use normalize::{normalize, parse_amount, parse_date};
pub use parser::{import_file, import_into, parse_import, ImportOutcome, ImportPolicy, ImportReport};
pub use record::{Category, ExpenseForm, ExpenseRecord, LedgerRow};
pub use store::LedgerStore;

use std::sync::Once;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static INIT_TRACING: Once = Once::new();

/// Installs the global tracing subscriber (stderr, `RUST_LOG` aware).
///
/// Defaults to `expense_ledger=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("expense_ledger=info"));

        // A subscriber may already be set by an embedding application.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_tracing_is_idempotent() {
        super::init_tracing();
        super::init_tracing();
    }
}
