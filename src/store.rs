// Ledger Store - in-memory table plus its durable CSV mirror
// Every mutation rewrites the whole file before it returns

use crate::errors::LedgerError;
use crate::normalize::normalize;
use crate::parser::read_rows;
use crate::record::{ExpenseRecord, LedgerRow, LEDGER_HEADERS};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TMP_SUFFIX: &str = "tmp";

/// Session-scoped handle on one ledger file.
///
/// The file is read at most once, on first access; afterwards the cached
/// rows are authoritative and each mutation is flushed in full.
#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    rows: Option<Vec<LedgerRow>>,
}

impl LedgerStore {
    /// Bind a store to `path`. No I/O happens until the first access.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        LedgerStore {
            path: path.into(),
            rows: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been read into memory yet.
    pub fn is_loaded(&self) -> bool {
        self.rows.is_some()
    }

    /// Rows of the ledger, with failed cells marked `None`.
    ///
    /// Creates the file with just a header row if it does not exist.
    pub fn load(&mut self) -> Result<&[LedgerRow], LedgerError> {
        if self.rows.is_none() {
            let rows = self.hydrate()?;
            self.rows = Some(rows);
        }
        Ok(self.rows.as_deref().unwrap_or(&[]))
    }

    /// Typed view of the ledger: [`normalize`] applied to [`load`](Self::load).
    pub fn snapshot(&mut self) -> Result<Vec<ExpenseRecord>, LedgerError> {
        Ok(normalize(self.load()?))
    }

    /// Add one record and rewrite the file.
    pub fn append(&mut self, record: ExpenseRecord) -> Result<(), LedgerError> {
        let row = LedgerRow::from(record);
        self.load()?;
        let existing = self.rows.as_deref().unwrap_or(&[]);
        write_rows(&self.path, existing.iter().chain(std::iter::once(&row)))?;

        self.rows.get_or_insert_with(Vec::new).push(row);
        debug!(path = %self.path.display(), "appended expense");
        Ok(())
    }

    /// Discard the whole ledger and substitute `records`.
    pub fn replace(&mut self, records: Vec<ExpenseRecord>) -> Result<(), LedgerError> {
        let rows: Vec<LedgerRow> = records.into_iter().map(LedgerRow::from).collect();
        write_rows(&self.path, rows.iter())?;

        info!(path = %self.path.display(), rows = rows.len(), "ledger replaced");
        self.rows = Some(rows);
        Ok(())
    }

    fn hydrate(&self) -> Result<Vec<LedgerRow>, LedgerError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no ledger file; creating an empty one");
            write_rows(&self.path, std::iter::empty())?;
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let (_, rows) = read_rows(file)?;
        info!(path = %self.path.display(), rows = rows.len(), "ledger loaded");
        Ok(rows)
    }
}

/// Write header and rows to a sibling temp file, then rename it over `path`.
fn write_rows<'a>(
    path: &Path,
    rows: impl Iterator<Item = &'a LedgerRow>,
) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(path);
    let written = write_csv(&tmp, rows).and_then(|()| fs::rename(&tmp, path).map_err(LedgerError::from));
    if written.is_err() {
        // Never leave a half-written sibling behind.
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn write_csv<'a>(
    path: &Path,
    rows: impl Iterator<Item = &'a LedgerRow>,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(LEDGER_HEADERS)?;
    for row in rows {
        writer.write_record(row.to_cells())?;
    }
    writer.flush()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(y: i32, m: u32, d: u32, category: &str, amount: f64) -> ExpenseRecord {
        ExpenseRecord::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            category,
            amount,
            "",
        )
    }

    #[test]
    fn test_load_creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        let mut store = LedgerStore::open(&path);

        assert!(!store.is_loaded());
        assert!(store.load().unwrap().is_empty());
        assert!(store.is_loaded());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Date,Category,Amount,Description\n");
    }

    #[test]
    fn test_append_persists_full_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        let mut store = LedgerStore::open(&path);

        store.append(record(2024, 1, 1, "Food", 100.0)).unwrap();
        store.append(record(2024, 1, 2, "Travel", 25.5)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Date,Category,Amount,Description\n\
             2024-01-01 00:00:00,Food,100,\n\
             2024-01-02 00:00:00,Travel,25.5,\n"
        );
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_load_is_cached_after_first_access() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        let mut store = LedgerStore::open(&path);
        store.append(record(2024, 1, 1, "Food", 100.0)).unwrap();

        // External edits after the first load are not observed.
        fs::write(&path, "Date,Category,Amount,Description\n").unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_load_degrades_bad_cells_to_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        fs::write(
            &path,
            "Date,Category,Amount,Description\n\
             2024-01-01,Food,12,ok\n\
             garbage,Food,7,bad date\n\
             2024-01-03,Bills,abc,bad amount\n",
        )
        .unwrap();
        let mut store = LedgerStore::open(&path);

        let rows = store.load().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].date.is_none());
        assert!(rows[2].amount.is_none());

        assert_eq!(store.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_non_utf8_row_survives_load_and_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        fs::write(&path, b"Date,Category,Amount,Description\n2024-01-01,Food,12,caf\xe9\n").unwrap();
        let mut store = LedgerStore::open(&path);

        assert_eq!(store.load().unwrap().len(), 1);
        store.append(record(2024, 1, 2, "Bills", 5.0)).unwrap();

        let snapshot = LedgerStore::open(&path).snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].amount, 12.0);
        assert_eq!(snapshot[0].description, "caf\u{fffd}");
    }

    #[test]
    fn test_non_utf8_header_still_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        fs::write(&path, b"Date,Category,Amount,Descripci\xf3n\n2024-01-01,Food,12,lunch\n").unwrap();
        let mut store = LedgerStore::open(&path);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].description, "");
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory where the ledger file should be makes the rename fail.
        let path = dir.path().join("expenses.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();
        let mut store = LedgerStore::open(&path);

        assert!(store.replace(vec![record(2024, 1, 1, "Food", 1.0)]).is_err());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_replace_discards_previous_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        let mut store = LedgerStore::open(&path);
        store.append(record(2024, 1, 1, "Food", 100.0)).unwrap();

        store.replace(vec![record(2024, 2, 1, "Bills", 60.0)]).unwrap();

        let mut reopened = LedgerStore::open(&path);
        let snapshot = reopened.snapshot().unwrap();
        assert_eq!(snapshot, vec![record(2024, 2, 1, "Bills", 60.0)]);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("expenses.csv");
        let mut store = LedgerStore::open(&path);

        store.append(record(2024, 1, 1, "Food", 1.0)).unwrap();

        assert!(path.exists());
    }
}
