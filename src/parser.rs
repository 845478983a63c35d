// CSV reading and bulk import
// Header-driven column lookup shared by the ledger file and uploaded files

use crate::errors::ImportError;
use crate::normalize::{normalize, parse_amount, parse_date};
use crate::record::{ExpenseRecord, LedgerRow};
use crate::store::LedgerStore;
use csv::{ByteRecord, ReaderBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns an import must carry (case-sensitive, exact match).
pub const REQUIRED_COLUMNS: [&str; 3] = ["Date", "Category", "Amount"];

// ============================================================================
// COLUMN MAP
// ============================================================================

/// Position of each known column in a file's header row.
///
/// Columns are looked up by name, so their order in the file does not matter
/// and unknown columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub category: Option<usize>,
    pub amount: Option<usize>,
    pub description: Option<usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &ByteRecord) -> Self {
        let names: Vec<String> = headers.iter().map(decode_cell).collect();
        let find = |name: &str| names.iter().position(|h| h == name);
        ColumnMap {
            date: find("Date"),
            category: find("Category"),
            amount: find("Amount"),
            description: find("Description"),
        }
    }

    /// Required columns absent from the header row, in canonical order.
    pub fn missing_required(&self) -> Vec<String> {
        [self.date, self.category, self.amount]
            .iter()
            .zip(REQUIRED_COLUMNS)
            .filter(|(idx, _)| idx.is_none())
            .map(|(_, name)| name.to_string())
            .collect()
    }

    /// Coerce one CSV record. Missing or unparseable cells become `None`/empty.
    pub fn coerce(&self, record: &ByteRecord) -> LedgerRow {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(decode_cell)
                .unwrap_or_default()
        };

        LedgerRow {
            date: parse_date(&cell(self.date)),
            category: cell(self.category),
            amount: parse_amount(&cell(self.amount)),
            description: cell(self.description),
        }
    }
}

/// Invalid UTF-8 degrades to U+FFFD within the one cell that carries it.
fn decode_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read every row of a CSV source, coercing cells as it goes.
///
/// Ragged rows and non-UTF-8 bytes are tolerated, so every data row yields a
/// [`LedgerRow`]; only I/O failures are returned as errors.
pub fn read_rows<R: Read>(source: R) -> Result<(ColumnMap, Vec<LedgerRow>), csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let columns = ColumnMap::from_headers(reader.byte_headers()?);

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        rows.push(columns.coerce(&result?));
    }

    Ok((columns, rows))
}

// ============================================================================
// BULK IMPORT
// ============================================================================

/// What to do when an import has no valid rows but the ledger does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportPolicy {
    /// Replace the ledger anyway, leaving it empty.
    #[default]
    Replace,
    /// Refuse the import and keep the existing ledger.
    RejectEmpty,
}

/// Records accepted from an import file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub records: Vec<ExpenseRecord>,
    /// Rows dropped because their date or amount did not parse.
    pub dropped: usize,
}

/// Result of applying an import to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub dropped: usize,
    /// Rows held by the ledger before it was replaced.
    pub replaced: usize,
}

/// Validate and parse an uploaded CSV without touching any ledger.
pub fn parse_import<R: Read>(source: R) -> Result<ImportOutcome, ImportError> {
    let (columns, rows) = read_rows(source)?;

    let missing = columns.missing_required();
    if !missing.is_empty() {
        warn!(?missing, "import rejected: required columns absent");
        return Err(ImportError::MissingColumns(missing));
    }

    let records = normalize(&rows);
    let dropped = rows.len() - records.len();
    debug!(accepted = records.len(), dropped, "parsed import file");

    Ok(ImportOutcome { records, dropped })
}

/// Parse an uploaded CSV and make it the new ledger snapshot.
///
/// On any error the store is left exactly as it was.
pub fn import_into<R: Read>(
    store: &mut LedgerStore,
    source: R,
    policy: ImportPolicy,
) -> Result<ImportReport, ImportError> {
    let outcome = parse_import(source)?;
    let existing = store.load()?.len();

    if outcome.records.is_empty() && existing > 0 {
        match policy {
            ImportPolicy::RejectEmpty => {
                warn!(existing, "import rejected: it would empty the ledger");
                return Err(ImportError::WouldEmptyLedger { existing });
            }
            ImportPolicy::Replace => {
                warn!(existing, "import has no valid rows; ledger will be emptied");
            }
        }
    }

    let report = ImportReport {
        imported: outcome.records.len(),
        dropped: outcome.dropped,
        replaced: existing,
    };
    store.replace(outcome.records)?;

    info!(
        imported = report.imported,
        dropped = report.dropped,
        replaced = report.replaced,
        "import applied"
    );
    Ok(report)
}

/// [`import_into`] reading from a file on disk.
pub fn import_file(
    store: &mut LedgerStore,
    path: &Path,
    policy: ImportPolicy,
) -> Result<ImportReport, ImportError> {
    let file = File::open(path)?;
    import_into(store, file, policy)
}
