// Spreadsheet export of a filtered view

use crate::aggregate::month_key;
use crate::errors::LedgerError;
use crate::record::{ExpenseRecord, DATE_FORMAT};
use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXPORT_FILE_NAME: &str = "Expense_Report.xlsx";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Expenses";
const EXCEL_DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const HEADERS: [&str; 5] = ["Date", "Category", "Amount", "Description", "Month"];

/// Encode `records` as an xlsx workbook. `None` when there is nothing to export.
pub fn export_xlsx(records: &[ExpenseRecord]) -> Result<Option<Vec<u8>>, LedgerError> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");
    let timestamp = Format::new().set_num_format(EXCEL_DATE_FORMAT);

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, r) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        match excel_datetime(&r.date) {
            Some(date) => sheet.write_datetime_with_format(row, 0, &date, &timestamp)?,
            None => sheet.write_string(row, 0, r.date.format(DATE_FORMAT).to_string())?,
        };
        sheet.write_string(row, 1, r.category.as_str())?;
        sheet.write_number_with_format(row, 2, r.amount, &money)?;
        sheet.write_string(row, 3, r.description.as_str())?;
        sheet.write_string(row, 4, month_key(&r.date))?;
    }

    Ok(Some(workbook.save_to_buffer()?))
}

/// Spreadsheet serial date, or `None` outside Excel's range (years 1900-9999).
fn excel_datetime(date: &NaiveDateTime) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok()?;
    let seconds = f64::from(date.second()) + f64::from(date.nanosecond()) / 1e9;

    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)
        .and_then(|day| day.and_hms(date.hour() as u16, date.minute() as u8, seconds))
        .ok()
}

/// Write [`EXPORT_FILE_NAME`] into `dir`. `None` when `records` is empty.
pub fn write_report(records: &[ExpenseRecord], dir: &Path) -> Result<Option<PathBuf>, LedgerError> {
    let Some(bytes) = export_xlsx(records)? else {
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, bytes)?;
    info!(path = %path.display(), rows = records.len(), "report exported");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample() -> Vec<ExpenseRecord> {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
        vec![
            ExpenseRecord::new(day, "Food", 12.5, "lunch"),
            ExpenseRecord::new(day, "Travel", 30.0, "train"),
        ]
    }

    #[test]
    fn test_empty_view_has_no_artifact() {
        assert!(export_xlsx(&[]).unwrap().is_none());

        let dir = TempDir::new().unwrap();
        assert!(write_report(&[], dir.path()).unwrap().is_none());
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_export_is_zip_container() {
        let bytes = export_xlsx(&sample()).unwrap().unwrap();

        // xlsx is a zip archive
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_dates_become_spreadsheet_datetimes() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap().and_hms_opt(14, 30, 0).unwrap();
        assert!(excel_datetime(&at).is_some());

        let early = NaiveDate::from_ymd_opt(1850, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(excel_datetime(&early).is_none());
    }

    #[test]
    fn test_out_of_range_date_still_exports() {
        let early = NaiveDate::from_ymd_opt(1850, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut records = sample();
        records.push(ExpenseRecord::new(early, "Other", 1.0, "heirloom"));

        let bytes = export_xlsx(&records).unwrap().unwrap();

        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_report_uses_fixed_name() {
        let dir = TempDir::new().unwrap();

        let path = write_report(&sample(), dir.path()).unwrap().unwrap();

        assert_eq!(path.file_name().unwrap(), EXPORT_FILE_NAME);
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }
}
