// Expense records - the ledger's data model
// Typed records (aggregation input) and nullable rows (storage form)

use crate::errors::FormError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp format of the `Date` column in the durable file.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Header row of the durable ledger file, in column order.
pub const LEDGER_HEADERS: [&str; 4] = ["Date", "Category", "Amount", "Description"];

// ============================================================================
// CATEGORY
// ============================================================================

/// Closed set of categories offered by the entry form.
///
/// Imported records are not restricted to this set; see [`ExpenseRecord::category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Food,
    Travel,
    Shopping,
    Bills,
    Entertainment,
    Education,
    Other,
}

impl Category {
    /// Form order.
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Travel,
        Category::Shopping,
        Category::Bills,
        Category::Entertainment,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }

    /// Next category in form order, wrapping around.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown category '{}' (expected one of: {})",
                    s,
                    Category::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

// ============================================================================
// EXPENSE RECORD
// ============================================================================

/// One expense whose date and amount are known to be well-typed.
///
/// This is the only shape the aggregator ever sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub date: NaiveDateTime,
    /// Free-form on import, one of [`Category`] on manual entry.
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

impl ExpenseRecord {
    pub fn new(
        date: NaiveDateTime,
        category: impl Into<String>,
        amount: f64,
        description: impl Into<String>,
    ) -> Self {
        ExpenseRecord {
            date,
            category: category.into(),
            amount,
            description: description.into(),
        }
    }

    /// Calendar day, dropping the time of day.
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

// ============================================================================
// LEDGER ROW
// ============================================================================

/// One row of the durable file after cell coercion.
///
/// `None` marks a cell that was empty or failed to parse. Such rows stay in
/// the store (and are written back as empty cells) but never reach
/// aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub date: Option<NaiveDateTime>,
    pub category: String,
    pub amount: Option<f64>,
    pub description: String,
}

impl LedgerRow {
    /// Cells as written to the durable file, in [`LEDGER_HEADERS`] order.
    pub fn to_cells(&self) -> [String; 4] {
        [
            self.date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            self.category.clone(),
            self.amount.map(|a| a.to_string()).unwrap_or_default(),
            self.description.clone(),
        ]
    }
}

impl From<ExpenseRecord> for LedgerRow {
    fn from(record: ExpenseRecord) -> Self {
        LedgerRow {
            date: Some(record.date),
            category: record.category,
            amount: Some(record.amount),
            description: record.description,
        }
    }
}

// ============================================================================
// MANUAL ENTRY
// ============================================================================

/// A filled-in entry form. Always yields exactly one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseForm {
    pub date: NaiveDate,
    pub category: Category,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

impl ExpenseForm {
    /// A form passes when its amount can be written and read back.
    ///
    /// Non-finite amounts would be dropped on the next load.
    pub fn validate(&self) -> Result<(), FormError> {
        if !self.amount.is_finite() {
            return Err(FormError::NonFiniteAmount(self.amount));
        }
        Ok(())
    }

    pub fn into_record(self) -> ExpenseRecord {
        ExpenseRecord {
            date: self.date.and_time(chrono::NaiveTime::MIN),
            category: self.category.as_str().to_string(),
            amount: self.amount,
            description: self.description,
        }
    }
}
