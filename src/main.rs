// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use expense_ledger::config::parse_amount_arg;
use expense_ledger::{
    filter, import_file, init_tracing, write_report, Category, ExpenseForm, ExpenseRecord,
    ImportPolicy, LedgerStore, Selection, Settings, Summary,
};

#[derive(Debug, Parser)]
#[command(name = "expense-ledger", version, about = "Personal expense ledger and dashboard")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record one expense
    Add {
        /// Expense date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// One of Food, Travel, Shopping, Bills, Entertainment, Education, Other
        #[arg(long)]
        category: Category,
        #[arg(long, allow_negative_numbers = true, value_parser = parse_amount_arg)]
        amount: f64,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Replace the ledger with the contents of a CSV file
    Import {
        file: PathBuf,
        /// Refuse an import with no valid rows instead of emptying the ledger
        #[arg(long)]
        reject_empty: bool,
    },
    /// Print totals, breakdown and trend for a filtered view
    Summary {
        #[command(flatten)]
        view: ViewArgs,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write the filtered view to Expense_Report.xlsx
    Export {
        #[command(flatten)]
        view: ViewArgs,
        /// Directory to write the report into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Interactive dashboard (default)
    Ui,
}

#[derive(Debug, Clone, clap::Args)]
struct ViewArgs {
    /// Month bucket (YYYY-MM) or All
    #[arg(long)]
    month: Option<String>,
    /// Category name or All
    #[arg(long)]
    category: Option<String>,
}

impl ViewArgs {
    fn selections(&self) -> (Selection, Selection) {
        (
            Selection::parse(self.month.as_deref()),
            Selection::parse(self.category.as_deref()),
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings;

    match cli.command.unwrap_or(Command::Ui) {
        Command::Add {
            date,
            category,
            amount,
            description,
        } => {
            init_tracing();
            let form = ExpenseForm {
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                category,
                amount,
                description,
            };
            run_add(&settings, form)
        }
        Command::Import { file, reject_empty } => {
            init_tracing();
            let policy = if reject_empty {
                ImportPolicy::RejectEmpty
            } else {
                ImportPolicy::Replace
            };
            run_import(&settings, &file, policy)
        }
        Command::Summary { view, json } => {
            init_tracing();
            run_summary(&settings, &view, json)
        }
        Command::Export { view, out } => {
            init_tracing();
            run_export(&settings, &view, &out)
        }
        Command::Ui => run_ui_mode(&settings),
    }
}

fn run_add(settings: &Settings, form: ExpenseForm) -> Result<()> {
    form.validate()?;

    let mut store = LedgerStore::open(&settings.ledger);
    store
        .append(form.into_record())
        .with_context(|| format!("Failed to write ledger: {}", settings.ledger.display()))?;

    println!("✅ Expense Added");
    Ok(())
}

fn run_import(settings: &Settings, file: &Path, policy: ImportPolicy) -> Result<()> {
    println!("📂 Importing {} → {}", file.display(), settings.ledger.display());

    let mut store = LedgerStore::open(&settings.ledger);
    let report = import_file(&mut store, file, policy)?;

    println!("✓ Imported: {} expenses", report.imported);
    if report.dropped > 0 {
        println!("✓ Dropped rows with invalid date/amount: {}", report.dropped);
    }
    if report.imported == 0 && report.replaced > 0 {
        println!("⚠ Ledger is now empty ({} previous rows replaced)", report.replaced);
    }
    println!("✅ CSV Uploaded & Dashboard Updated");
    Ok(())
}

fn load_view(settings: &Settings, view: &ViewArgs) -> Result<Vec<ExpenseRecord>> {
    let mut store = LedgerStore::open(&settings.ledger);
    let snapshot = store
        .snapshot()
        .with_context(|| format!("Failed to read ledger: {}", settings.ledger.display()))?;
    let (month, category) = view.selections();
    Ok(filter(&snapshot, &month, &category))
}

fn run_summary(settings: &Settings, view: &ViewArgs, json: bool) -> Result<()> {
    let records = load_view(settings, view)?;
    let summary = Summary::compute(&records, settings.budget);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.is_empty() {
        println!("No data available yet.");
        return Ok(());
    }

    println!("📌 Key Insights");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total Expense:  {:.2}", summary.total);
    println!("Transactions:   {}", summary.count);
    println!("Top Category:   {}", summary.top_category_label());

    if let (Some(usage), Some(status)) = (summary.budget_usage, summary.budget_status) {
        println!("Budget:         {:.1}% used, {}", usage, status.message());
    }

    println!("\n📊 Expenses by Category");
    for (category, share) in summary.distribution() {
        let amount = summary.breakdown.get(&category).copied().unwrap_or_default();
        println!("  {:<15} {:>12.2}  {:>5.1}%", category, amount, share);
    }

    println!("\n📈 Daily Trend");
    for (day, amount) in &summary.trend {
        println!("  {}  {:>12.2}", day, amount);
    }

    Ok(())
}

fn run_export(settings: &Settings, view: &ViewArgs, out: &Path) -> Result<()> {
    let records = load_view(settings, view)?;

    match write_report(&records, out)? {
        Some(path) => println!("📤 Report written to {}", path.display()),
        None => println!("No records match the current filters; nothing to export."),
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(settings: &Settings) -> Result<()> {
    // No tracing subscriber here: stderr belongs to the terminal UI.
    println!("🖥️  Loading Expense Dashboard...\n");

    let mut store = LedgerStore::open(&settings.ledger);
    store
        .load()
        .with_context(|| format!("Failed to read ledger: {}", settings.ledger.display()))?;

    let mut app = ui::App::new(store, settings.budget)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_settings: &Settings) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin expense-server --features server");
    std::process::exit(1);
}
