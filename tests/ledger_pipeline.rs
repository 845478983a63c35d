// End-to-end checks of the ledger pipeline: store, import, aggregation, export

use chrono::NaiveDate;
use expense_ledger::{
    filter, import_file, import_into, write_report, BudgetStatus, Category, ExpenseForm,
    ImportError, ImportPolicy, LedgerStore, Selection, Summary, EXPORT_FILE_NAME,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn ledger_in(dir: &TempDir) -> PathBuf {
    dir.path().join("expenses.csv")
}

fn form(y: i32, m: u32, d: u32, category: Category, amount: f64, description: &str) -> ExpenseForm {
    ExpenseForm {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        category,
        amount,
        description: description.to_string(),
    }
}

#[test]
fn appended_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = ledger_in(&dir);

    let mut store = LedgerStore::open(&path);
    store.append(form(2024, 1, 5, Category::Food, 12.5, "lunch").into_record()).unwrap();
    store.append(form(2024, 1, 6, Category::Travel, 30.0, "train, return").into_record()).unwrap();
    let before = store.snapshot().unwrap();

    let after = LedgerStore::open(&path).snapshot().unwrap();

    assert_eq!(after.len(), 2);
    assert_eq!(before, after);
    assert_eq!(after[1].description, "train, return");
}

#[test]
fn import_example_drops_invalid_rows() {
    let dir = TempDir::new().unwrap();
    let mut store = LedgerStore::open(ledger_in(&dir));
    let csv = "Date,Category,Amount\n2024-01-05,Food,12.5\nnot-a-date,Food,3\n2024-01-06,Travel,abc\n";

    let report = import_into(&mut store, csv.as_bytes(), ImportPolicy::Replace).unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.dropped, 2);
    let records = store.snapshot().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, "Food");
    assert_eq!(records[0].amount, 12.5);
    assert_eq!(records[0].description, "");
}

#[test]
fn rejected_import_leaves_file_byte_identical() {
    let dir = TempDir::new().unwrap();
    let path = ledger_in(&dir);
    let mut store = LedgerStore::open(&path);
    store.append(form(2024, 2, 1, Category::Bills, 300.0, "rent").into_record()).unwrap();
    let original = fs::read(&path).unwrap();

    let upload = dir.path().join("upload.csv");
    fs::write(&upload, "Date,Category\n2024-03-01,Food\n").unwrap();
    let err = import_file(&mut store, &upload, ImportPolicy::Replace).unwrap_err();

    assert!(matches!(err, ImportError::MissingColumns(ref cols) if cols == &["Amount".to_string()]));
    assert_eq!(fs::read(&path).unwrap(), original);
    assert_eq!(store.snapshot().unwrap().len(), 1);
}

#[test]
fn empty_import_respects_policy() {
    let dir = TempDir::new().unwrap();
    let path = ledger_in(&dir);
    let mut store = LedgerStore::open(&path);
    store.append(form(2024, 2, 1, Category::Bills, 300.0, "rent").into_record()).unwrap();
    let original = fs::read(&path).unwrap();
    let empty = "Date,Category,Amount\n,Food,\n";

    let err = import_into(&mut store, empty.as_bytes(), ImportPolicy::RejectEmpty).unwrap_err();
    assert!(matches!(err, ImportError::WouldEmptyLedger { existing: 1 }));
    assert_eq!(fs::read(&path).unwrap(), original);

    let report = import_into(&mut store, empty.as_bytes(), ImportPolicy::Replace).unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.replaced, 1);
    assert!(LedgerStore::open(&path).snapshot().unwrap().is_empty());
}

#[test]
fn filtered_summary_is_consistent() {
    let dir = TempDir::new().unwrap();
    let mut store = LedgerStore::open(ledger_in(&dir));
    let csv = "Date,Category,Amount,Description\n\
        2024-01-05,Food,100,groceries\n\
        2024-01-05,Food,20,snack\n\
        2024-01-09,Travel,40,bus\n\
        2024-02-01,Bills,300,rent\n";
    import_into(&mut store, csv.as_bytes(), ImportPolicy::Replace).unwrap();
    let records = store.snapshot().unwrap();

    let month = Selection::Only("2024-01".to_string());
    let january = filter(&records, &month, &Selection::All);
    assert_eq!(filter(&january, &month, &Selection::All), january);

    let summary = Summary::compute(&january, 200.0);
    assert_eq!(summary.count, 3);
    assert_eq!(summary.total, 160.0);
    assert_eq!(summary.breakdown.values().sum::<f64>(), summary.total);
    assert_eq!(summary.top_category.as_deref(), Some("Food"));
    assert_eq!(summary.trend.len(), 2);
    assert_eq!(summary.trend[0].1, 120.0);
    assert_eq!(summary.budget_usage, Some(80.0));
    assert_eq!(summary.budget_status, Some(BudgetStatus::Approaching));
}

#[test]
fn export_of_empty_view_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut store = LedgerStore::open(ledger_in(&dir));
    store.append(form(2024, 1, 5, Category::Food, 12.5, "lunch").into_record()).unwrap();
    let records = store.snapshot().unwrap();

    let none = filter(&records, &Selection::Only("1999-01".to_string()), &Selection::All);
    assert!(write_report(&none, dir.path()).unwrap().is_none());
    assert!(!dir.path().join(EXPORT_FILE_NAME).exists());

    let written = write_report(&records, dir.path()).unwrap().unwrap();
    assert_eq!(written, dir.path().join(EXPORT_FILE_NAME));
}

#[test]
fn only_finite_manual_entries_reach_the_ledger() {
    let dir = TempDir::new().unwrap();
    let path = ledger_in(&dir);
    let mut store = LedgerStore::open(&path);

    let bad = form(2024, 1, 1, Category::Food, f64::NAN, "");
    assert!(bad.validate().is_err());

    let refund = form(2024, 1, 1, Category::Food, -8.0, "returned");
    refund.validate().unwrap();
    store.append(refund.into_record()).unwrap();

    let reopened = LedgerStore::open(&path).snapshot().unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened[0].amount, -8.0);
}
