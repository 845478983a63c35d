// Aggregator - read-only views over a ledger snapshot
// Filters, per-category and per-day sums, budget bands

use crate::record::ExpenseRecord;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Label shown when there is no top category.
pub const NOT_AVAILABLE: &str = "N/A";

/// Usage percentage at which the budget counts as exceeded.
pub const EXCEEDED_THRESHOLD: f64 = 100.0;
/// Usage percentage at which the budget counts as nearly spent.
pub const APPROACHING_THRESHOLD: f64 = 80.0;

// ============================================================================
// SELECTION
// ============================================================================

/// A filter value: everything, or one exact key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `"All"` (or nothing) selects everything; anything else is an exact key.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("All") => Selection::All,
            Some(key) => Selection::Only(key.to_string()),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == key,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("All"),
            Selection::Only(key) => f.write_str(key),
        }
    }
}

// ============================================================================
// BUCKETS & FILTERS
// ============================================================================

/// Year-month bucket key, e.g. `2024-03`. Sorts chronologically as a string.
pub fn month_key(date: &NaiveDateTime) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn filter(records: &[ExpenseRecord], month: &Selection, category: &Selection) -> Vec<ExpenseRecord> {
    records
        .iter()
        .filter(|r| month.matches(&month_key(&r.date)))
        .filter(|r| category.matches(&r.category))
        .cloned()
        .collect()
}

/// Distinct month keys, ascending.
pub fn available_months(records: &[ExpenseRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| month_key(&r.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct categories, ascending.
pub fn available_categories(records: &[ExpenseRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// SUMS
// ============================================================================

pub fn total_amount(records: &[ExpenseRecord]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}

/// Summed amount per category present in `records`, keyed in name order.
pub fn category_breakdown(records: &[ExpenseRecord]) -> BTreeMap<String, f64> {
    let mut breakdown = BTreeMap::new();
    for r in records {
        *breakdown.entry(r.category.clone()).or_insert(0.0) += r.amount;
    }
    breakdown
}

/// Category with the largest sum. Ties go to the first name in ascending order.
pub fn top_category(records: &[ExpenseRecord]) -> Option<String> {
    let mut best: Option<(String, f64)> = None;
    for (category, sum) in category_breakdown(records) {
        match &best {
            Some((_, best_sum)) if sum <= *best_sum => {}
            _ => best = Some((category, sum)),
        }
    }
    best.map(|(category, _)| category)
}

/// Summed amount per calendar day, ascending by date.
pub fn daily_trend(records: &[ExpenseRecord]) -> Vec<(NaiveDate, f64)> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        *days.entry(r.day()).or_insert(0.0) += r.amount;
    }
    days.into_iter().collect()
}

// ============================================================================
// BUDGET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Exceeded,
    Approaching,
    UnderControl,
}

impl BudgetStatus {
    /// Band for a usage percentage; each band includes its lower bound.
    pub fn from_usage(usage: f64) -> Self {
        if usage >= EXCEEDED_THRESHOLD {
            BudgetStatus::Exceeded
        } else if usage >= APPROACHING_THRESHOLD {
            BudgetStatus::Approaching
        } else {
            BudgetStatus::UnderControl
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BudgetStatus::Exceeded => "Budget Exceeded!",
            BudgetStatus::Approaching => "Approaching Budget Limit",
            BudgetStatus::UnderControl => "Budget Under Control",
        }
    }
}

/// `total / budget * 100`, or `None` when no positive budget is set.
pub fn budget_usage(total: f64, budget: f64) -> Option<f64> {
    (budget > 0.0).then(|| total / budget * 100.0)
}

pub fn budget_status(total: f64, budget: f64) -> Option<BudgetStatus> {
    budget_usage(total, budget).map(BudgetStatus::from_usage)
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Everything a dashboard shows for one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: f64,
    pub count: usize,
    pub top_category: Option<String>,
    pub breakdown: BTreeMap<String, f64>,
    pub trend: Vec<(NaiveDate, f64)>,
    pub budget_usage: Option<f64>,
    pub budget_status: Option<BudgetStatus>,
}

impl Summary {
    pub fn compute(records: &[ExpenseRecord], budget: f64) -> Self {
        let total = total_amount(records);
        Summary {
            total,
            count: records.len(),
            top_category: top_category(records),
            breakdown: category_breakdown(records),
            trend: daily_trend(records),
            budget_usage: budget_usage(total, budget),
            budget_status: budget_status(total, budget),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn top_category_label(&self) -> &str {
        self.top_category.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Share of the total per category, in percent. Empty when the total is 0.
    pub fn distribution(&self) -> Vec<(String, f64)> {
        if self.total == 0.0 {
            return Vec::new();
        }
        self.breakdown
            .iter()
            .map(|(category, sum)| (category.clone(), sum / self.total * 100.0))
            .collect()
    }
}
