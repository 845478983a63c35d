use thiserror::Error;

/// Failures of the durable ledger and its export.
///
/// Bad cells are never errors here: they are coerced to `None` and dropped
/// by normalization. Only the storage medium (or the export encoder) can fail.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

/// A manual entry that cannot be stored as a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Amount must be a finite number, got {0}")]
    NonFiniteAmount(f64),
}

/// Reasons a bulk import is rejected. In every case the ledger is untouched.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV must contain Date, Category, Amount columns (missing: {})", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("import has no valid rows and would replace {existing} existing records")]
    WouldEmptyLedger { existing: usize },
    #[error("could not read import file: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Ledger(LedgerError::Io(err))
    }
}
