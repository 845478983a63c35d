use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use expense_ledger::{
    available_categories, available_months, filter, import_file, write_report, BudgetStatus,
    Category, ExpenseForm, ExpenseRecord, ImportError, ImportPolicy, LedgerError, LedgerStore,
    Selection, Summary,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Clear, Dataset, Gauge, GraphType, Paragraph,
        Row, Table, TableState,
    },
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

/// Budget change per `+`/`-` key press.
const BUDGET_STEP: f64 = 500.0;
const FORM_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Trend,
    Expenses,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Trend,
            Page::Trend => Page::Expenses,
            Page::Expenses => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Expenses,
            Page::Trend => Page::Dashboard,
            Page::Expenses => Page::Trend,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Trend => "Spending Trend",
            Page::Expenses => "Expense Table",
        }
    }
}

// ============================================================================
// ENTRY FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Date,
    Category,
    Amount,
    Description,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Date => FormField::Category,
            FormField::Category => FormField::Amount,
            FormField::Amount => FormField::Description,
            FormField::Description => FormField::Date,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            FormField::Date => FormField::Description,
            FormField::Category => FormField::Date,
            FormField::Amount => FormField::Category,
            FormField::Description => FormField::Amount,
        }
    }
}

/// Text typed into the add-expense popup.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub field: FormField,
    pub date: String,
    pub category: Category,
    pub amount: String,
    pub description: String,
    pub error: Option<String>,
}

impl FormState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            field: FormField::Date,
            date: today.format(FORM_DATE_FORMAT).to_string(),
            category: Category::Food,
            amount: String::new(),
            description: String::new(),
            error: None,
        }
    }

    fn active_text(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Date => Some(&mut self.date),
            FormField::Amount => Some(&mut self.amount),
            FormField::Description => Some(&mut self.description),
            FormField::Category => None,
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(text) = self.active_text() {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.active_text() {
            text.pop();
        }
    }

    /// Typed form, or a message for the first field that does not parse.
    pub fn validate(&self) -> Result<ExpenseForm, String> {
        let date = NaiveDate::parse_from_str(self.date.trim(), FORM_DATE_FORMAT)
            .map_err(|_| format!("Invalid date '{}': use YYYY-MM-DD", self.date.trim()))?;

        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| "Amount must be a number".to_string())?;
        let form = ExpenseForm {
            date,
            category: self.category,
            amount,
            description: self.description.trim().to_string(),
        };
        form.validate().map_err(|err| err.to_string())?;
        if amount < 0.0 {
            return Err("Amount must be zero or more".to_string());
        }
        Ok(form)
    }
}

// ============================================================================
// APP STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,
    AddExpense(FormState),
    ImportPrompt(String),
    /// The import had no valid rows; waiting for the user to confirm emptying the ledger.
    ConfirmEmptyImport { path: PathBuf, existing: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn color(&self) -> Color {
        match self {
            Level::Info => Color::Cyan,
            Level::Success => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

pub struct App {
    store: LedgerStore,
    pub snapshot: Vec<ExpenseRecord>,
    pub filtered: Vec<ExpenseRecord>,
    pub summary: Summary,
    pub months: Vec<String>,
    pub categories: Vec<String>,
    pub month: Selection,
    pub category: Selection,
    pub budget: f64,
    pub state: TableState,
    pub current_page: Page,
    pub mode: Mode,
    pub status: Option<(Level, String)>,
    pub export_dir: PathBuf,
}

impl App {
    pub fn new(mut store: LedgerStore, budget: f64) -> Result<Self, LedgerError> {
        let snapshot = store.snapshot()?;

        let mut app = Self {
            store,
            snapshot,
            filtered: Vec::new(),
            summary: Summary::compute(&[], budget),
            months: Vec::new(),
            categories: Vec::new(),
            month: Selection::All,
            category: Selection::All,
            budget,
            state: TableState::default(),
            current_page: Page::Dashboard,
            mode: Mode::Normal,
            status: None,
            export_dir: PathBuf::from("."),
        };
        app.apply_filters();
        Ok(app)
    }

    fn set_status(&mut self, level: Level, text: impl Into<String>) {
        self.status = Some((level, text.into()));
    }

    /// Re-read the normalized snapshot after a mutation.
    fn reload(&mut self) {
        match self.store.snapshot() {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(err) => self.set_status(Level::Error, format!("Could not read ledger: {err}")),
        }
        self.apply_filters();
    }

    pub fn apply_filters(&mut self) {
        self.months = available_months(&self.snapshot);
        self.categories = available_categories(&self.snapshot);

        // A selection whose key vanished (e.g. after an import) falls back to All.
        if let Selection::Only(month) = &self.month {
            if !self.months.contains(month) {
                self.month = Selection::All;
            }
        }
        if let Selection::Only(category) = &self.category {
            if !self.categories.contains(category) {
                self.category = Selection::All;
            }
        }

        self.filtered = filter(&self.snapshot, &self.month, &self.category);
        self.summary = Summary::compute(&self.filtered, self.budget);

        if self.filtered.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn cycle_month(&mut self, forward: bool) {
        self.month = cycle(&self.month, &self.months, forward);
        self.apply_filters();
    }

    pub fn cycle_category(&mut self, forward: bool) {
        self.category = cycle(&self.category, &self.categories, forward);
        self.apply_filters();
    }

    pub fn reset_filters(&mut self) {
        self.month = Selection::All;
        self.category = Selection::All;
        self.apply_filters();
    }

    pub fn adjust_budget(&mut self, delta: f64) {
        self.budget = (self.budget + delta).max(0.0);
        self.summary = Summary::compute(&self.filtered, self.budget);
    }

    pub fn open_form(&mut self) {
        self.mode = Mode::AddExpense(FormState::new(Local::now().date_naive()));
    }

    pub fn submit_form(&mut self) {
        let Mode::AddExpense(form) = &mut self.mode else {
            return;
        };
        let expense = match form.validate() {
            Ok(expense) => expense,
            Err(message) => {
                form.error = Some(message);
                return;
            }
        };

        match self.store.append(expense.into_record()) {
            Ok(()) => {
                self.mode = Mode::Normal;
                self.set_status(Level::Success, "Expense Added");
                self.reload();
            }
            Err(err) => self.set_status(Level::Error, format!("Could not save expense: {err}")),
        }
    }

    pub fn import(&mut self, path: PathBuf, policy: ImportPolicy) {
        match import_file(&mut self.store, &path, policy) {
            Ok(report) => {
                self.mode = Mode::Normal;
                self.set_status(
                    Level::Success,
                    format!(
                        "CSV Uploaded & Dashboard Updated: {} rows ({} dropped)",
                        report.imported, report.dropped
                    ),
                );
                self.reload();
            }
            Err(ImportError::WouldEmptyLedger { existing }) => {
                self.mode = Mode::ConfirmEmptyImport { path, existing };
            }
            Err(err) => {
                self.mode = Mode::Normal;
                self.set_status(Level::Error, err.to_string());
            }
        }
    }

    pub fn export(&mut self) {
        match write_report(&self.filtered, &self.export_dir) {
            Ok(Some(path)) => {
                self.set_status(Level::Success, format!("Report saved: {}", path.display()))
            }
            Ok(None) => self.set_status(Level::Warning, "Nothing to export for these filters"),
            Err(err) => self.set_status(Level::Error, format!("Export failed: {err}")),
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(20));
        self.state.select(Some(i));
    }

    /// Returns `false` when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match &mut self.mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::AddExpense(form) => match key.code {
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Enter => self.submit_form(),
                KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
                KeyCode::BackTab | KeyCode::Up => form.field = form.field.previous(),
                KeyCode::Left if form.field == FormField::Category => {
                    form.category = form.category.previous()
                }
                KeyCode::Right if form.field == FormField::Category => {
                    form.category = form.category.next()
                }
                KeyCode::Backspace => form.backspace(),
                KeyCode::Char(c) => form.push_char(c),
                _ => {}
            },
            Mode::ImportPrompt(input) => match key.code {
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Enter => {
                    let path = PathBuf::from(input.trim());
                    self.import(path, ImportPolicy::RejectEmpty);
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            },
            Mode::ConfirmEmptyImport { path, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let path = path.clone();
                    self.import(path, ImportPolicy::Replace);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.mode = Mode::Normal;
                    self.set_status(Level::Info, "Import cancelled; ledger unchanged");
                }
                _ => {}
            },
        }
        true
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            KeyCode::Char('m') => self.cycle_month(true),
            KeyCode::Char('M') => self.cycle_month(false),
            KeyCode::Char('c') => self.cycle_category(true),
            KeyCode::Char('C') => self.cycle_category(false),
            KeyCode::Char('r') => self.reset_filters(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_budget(BUDGET_STEP),
            KeyCode::Char('-') => self.adjust_budget(-BUDGET_STEP),
            KeyCode::Char('a') => self.open_form(),
            KeyCode::Char('i') => self.mode = Mode::ImportPrompt(String::new()),
            KeyCode::Char('x') => self.export(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home if !self.filtered.is_empty() => self.state.select(Some(0)),
            KeyCode::End if !self.filtered.is_empty() => {
                self.state.select(Some(self.filtered.len() - 1))
            }
            _ => {}
        }
        true
    }
}

/// Step through `All` followed by `keys`, wrapping around.
fn cycle(current: &Selection, keys: &[String], forward: bool) -> Selection {
    let options = keys.len() + 1;
    let pos = match current {
        Selection::All => 0,
        Selection::Only(key) => keys.iter().position(|k| k == key).map_or(0, |i| i + 1),
    };
    let next = if forward {
        (pos + 1) % options
    } else {
        (pos + options - 1) % options
    };

    match next {
        0 => Selection::All,
        i => Selection::Only(keys[i - 1].clone()),
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(());
            }
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation and filters
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.snapshot.is_empty() {
        render_empty(f, chunks[1], "No data available yet. Press 'a' to add an expense or 'i' to import a CSV.");
    } else {
        match app.current_page {
            Page::Dashboard => render_dashboard(f, chunks[1], app),
            Page::Trend => render_trend(f, chunks[1], app),
            Page::Expenses => render_table(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);

    match &app.mode {
        Mode::Normal => {}
        Mode::AddExpense(form) => render_form(f, form),
        Mode::ImportPrompt(input) => render_import_prompt(f, input),
        Mode::ConfirmEmptyImport { path, existing } => render_confirm_empty(f, path, *existing),
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Dashboard, Page::Trend, Page::Expenses];

    let mut spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled("Month: ", Style::default().fg(Color::Cyan)));
    spans.push(Span::raw(app.month.to_string()));
    spans.push(Span::raw("  "));
    spans.push(Span::styled("Category: ", Style::default().fg(Color::Cyan)));
    spans.push(Span::raw(app.category.to_string()));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled("Budget: ", Style::default().fg(Color::Cyan)));
    spans.push(Span::raw(if app.budget > 0.0 {
        format!("{:.2}", app.budget)
    } else {
        "off".to_string()
    }));

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Smart Expense Tracker "),
    );

    f.render_widget(header, area);
}

fn render_empty(f: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Metrics
            Constraint::Length(3), // Budget alert
            Constraint::Min(0),    // Charts
        ])
        .split(area);

    render_metrics(f, rows[0], &app.summary);
    render_budget(f, rows[1], &app.summary);

    if app.summary.is_empty() {
        render_empty(f, rows[2], "No records match the current filters.");
        return;
    }

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);

    render_distribution(f, charts[0], &app.summary);
    render_category_bars(f, charts[1], &app.summary);
}

fn render_metrics(f: &mut Frame, area: Rect, summary: &Summary) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let metrics = [
        ("Total Expense", format!("{:.2}", summary.total)),
        ("Transactions", summary.count.to_string()),
        ("Top Category", summary.top_category_label().to_string()),
    ];

    for (col, (title, value)) in cols.iter().zip(metrics) {
        let metric = Paragraph::new(Span::styled(
            value,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        );
        f.render_widget(metric, *col);
    }
}

fn render_budget(f: &mut Frame, area: Rect, summary: &Summary) {
    let (Some(usage), Some(status)) = (summary.budget_usage, summary.budget_status) else {
        let hint = Paragraph::new("No monthly budget set (press + to add one)")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Budget "));
        f.render_widget(hint, area);
        return;
    };

    let color = match status {
        BudgetStatus::Exceeded => Color::Red,
        BudgetStatus::Approaching => Color::Yellow,
        BudgetStatus::UnderControl => Color::Green,
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Budget "))
        .gauge_style(Style::default().fg(color))
        .ratio((usage / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.1}%  {}", usage, status.message()));

    f.render_widget(gauge, area);
}

/// Proportional view: one percentage bar per category.
fn render_distribution(f: &mut Frame, area: Rect, summary: &Summary) {
    let bar_width = (area.width as usize).saturating_sub(30).clamp(5, 40);

    let lines: Vec<Line> = summary
        .distribution()
        .into_iter()
        .map(|(category, share)| {
            Line::from(vec![
                Span::styled(format!(" {:<14}", truncate(&category, 14)), Style::default().fg(Color::Cyan)),
                Span::raw(percentage_bar(share, bar_width)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Expense Distribution "),
    );
    f.render_widget(paragraph, area);
}

fn render_category_bars(f: &mut Frame, area: Rect, summary: &Summary) {
    // Bars cannot go below zero; negative sums render as empty bars.
    let owned: Vec<(String, u64)> = summary
        .breakdown
        .iter()
        .map(|(category, sum)| (truncate(category, 8), sum.max(0.0).round() as u64))
        .collect();
    let data: Vec<(&str, u64)> = owned.iter().map(|(label, value)| (label.as_str(), *value)).collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Expenses by Category "),
        )
        .data(data.as_slice())
        .bar_width(8)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD))
        .label_style(Style::default().fg(Color::White));

    f.render_widget(chart, area);
}

fn render_trend(f: &mut Frame, area: Rect, app: &App) {
    let trend = &app.summary.trend;
    let (Some((first, _)), Some((last, _))) = (trend.first(), trend.last()) else {
        render_empty(f, area, "No records match the current filters.");
        return;
    };

    let points: Vec<(f64, f64)> = trend
        .iter()
        .map(|(day, amount)| ((*day - *first).num_days() as f64, *amount))
        .collect();

    let span_days = ((*last - *first).num_days() as f64).max(1.0);
    let max = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::max);
    let min = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::min);
    let top = if max > 0.0 { max * 1.1 } else { 1.0 };

    let mid = *first + chrono::Duration::days((span_days / 2.0) as i64);

    let datasets = vec![Dataset::default()
        .name("Daily total")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Daily Expense Trend "),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, span_days])
                .labels(vec![
                    Span::raw(first.to_string()),
                    Span::raw(mid.to_string()),
                    Span::raw(last.to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Amount")
                .style(Style::default().fg(Color::Gray))
                .bounds([min, top])
                .labels(vec![
                    Span::raw(format!("{:.0}", min)),
                    Span::raw(format!("{:.0}", (min + top) / 2.0)),
                    Span::raw(format!("{:.0}", top)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Category", "Amount", "Description"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered.iter().map(|r| {
        let color = if r.amount < 0.0 { Color::Green } else { Color::Red };
        Row::new(vec![
            Cell::from(r.day().to_string()),
            Cell::from(truncate(&r.category, 20)),
            Cell::from(format!("{:.2}", r.amount)).style(Style::default().fg(color)),
            Cell::from(truncate(&r.description, 40)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Expenses "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.filtered.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some((level, text)) = &app.status {
        spans.push(Span::raw("| "));
        spans.push(Span::styled(text.clone(), Style::default().fg(level.color())));
        spans.push(Span::raw(" "));
    }

    let hints = [
        ("Tab", " Page "),
        ("m/c", " Filter "),
        ("r", " Reset "),
        ("+/-", " Budget "),
        ("a", " Add "),
        ("i", " Import "),
        ("x", " Export "),
    ];
    for (key, label) in hints {
        spans.push(Span::raw("| "));
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(label));
    }
    spans.push(Span::raw("| "));
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_form(f: &mut Frame, form: &FormState) {
    let area = centered_rect(50, 12, f.size());

    let field_line = |field: FormField, label: &str, value: String| {
        let active = form.field == field;
        let label_style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let cursor = if active && field != FormField::Category { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("  {:<13}", label), label_style),
            Span::raw(format!("{}{}", value, cursor)),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field_line(FormField::Date, "Date:", form.date.clone()),
        field_line(FormField::Category, "Category:", format!("◀ {} ▶", form.category)),
        field_line(FormField::Amount, "Amount:", form.amount.clone()),
        field_line(FormField::Description, "Description:", form.description.clone()),
        Line::from(""),
    ];
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "  Tab next field · ←/→ category · Enter save · Esc cancel",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Add New Expense "),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_import_prompt(f: &mut Frame, input: &str) {
    let area = centered_rect(60, 7, f.size());

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  CSV path: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}_", input)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Needs Date, Category, Amount columns. Replaces the whole ledger.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Upload Expense CSV "),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_confirm_empty(f: &mut Frame, path: &std::path::Path, existing: usize) {
    let area = centered_rect(60, 7, f.size());

    let lines = vec![
        Line::from(""),
        Line::from(format!("  {} has no valid rows.", path.display())),
        Line::from(format!("  Importing it deletes all {} existing records.", existing)),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" replace anyway   "),
            Span::styled("n", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" keep current ledger"),
        ]),
    ];

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Empty Import "),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

/// Rect of `width_pct` percent width and fixed `height`, centered in `area`.
fn centered_rect(width_pct: u16, height: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_pct) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// `████████░░  80.0%` style bar for a percentage.
fn percentage_bar(percentage: f64, width: usize) -> String {
    let ratio = (percentage / 100.0).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!(
        "{}{} {:>5.1}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        percentage
    )
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(csv: &str) -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.csv");
        fs::write(&path, csv).unwrap();
        let mut app = App::new(LedgerStore::open(path), 1000.0).unwrap();
        app.export_dir = dir.path().to_path_buf();
        (dir, app)
    }

    const SAMPLE: &str = "Date,Category,Amount,Description\n\
        2024-01-05,Food,100,groceries\n\
        2024-01-09,Travel,40,bus\n\
        2024-02-01,Bills,300,rent\n";

    #[test]
    fn test_cycle_wraps_through_all() {
        let keys = vec!["a".to_string(), "b".to_string()];

        let first = cycle(&Selection::All, &keys, true);
        assert_eq!(first, Selection::Only("a".to_string()));
        assert_eq!(cycle(&Selection::Only("b".to_string()), &keys, true), Selection::All);
        assert_eq!(cycle(&Selection::All, &keys, false), Selection::Only("b".to_string()));
    }

    #[test]
    fn test_month_filter_updates_summary() {
        let (_dir, mut app) = app_with(SAMPLE);
        assert_eq!(app.summary.count, 3);

        app.cycle_month(true);

        assert_eq!(app.month, Selection::Only("2024-01".to_string()));
        assert_eq!(app.summary.count, 2);
        assert_eq!(app.summary.total, 140.0);
    }

    #[test]
    fn test_form_rejects_bad_amount() {
        let mut form = FormState::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        form.amount = "ten".to_string();
        assert!(form.validate().is_err());

        form.amount = "-1".to_string();
        assert!(form.validate().is_err());

        form.amount = "NaN".to_string();
        assert!(form.validate().unwrap_err().contains("finite"));

        form.amount = "12.5".to_string();
        let expense = form.validate().unwrap();
        assert_eq!(expense.amount, 12.5);
        assert_eq!(expense.category, Category::Food);
    }

    #[test]
    fn test_add_expense_through_keys() {
        let (_dir, mut app) = app_with(SAMPLE);

        app.handle_key(key(KeyCode::Char('a')));
        if let Mode::AddExpense(form) = &mut app.mode {
            form.date = "2024-02-10".to_string();
        }
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Tab));
        for c in "55".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.snapshot.len(), 4);
        let added = app.snapshot.last().unwrap();
        assert_eq!(added.category, "Travel");
        assert_eq!(added.amount, 55.0);
    }

    #[test]
    fn test_empty_import_asks_for_confirmation() {
        let (dir, mut app) = app_with(SAMPLE);
        let upload = dir.path().join("upload.csv");
        fs::write(&upload, "Date,Category,Amount\nnope,Food,1\n").unwrap();

        app.import(upload.clone(), ImportPolicy::RejectEmpty);
        assert!(matches!(app.mode, Mode::ConfirmEmptyImport { existing: 3, .. }));
        assert_eq!(app.snapshot.len(), 3);

        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.snapshot.is_empty());
    }

    #[test]
    fn test_import_resets_vanished_filters() {
        let (dir, mut app) = app_with(SAMPLE);
        app.cycle_category(true);
        assert_eq!(app.category, Selection::Only("Bills".to_string()));

        let upload = dir.path().join("upload.csv");
        fs::write(&upload, "Date,Category,Amount\n2024-03-01,Food,9\n").unwrap();
        app.import(upload, ImportPolicy::RejectEmpty);

        assert_eq!(app.category, Selection::All);
        assert_eq!(app.summary.count, 1);
    }

    #[test]
    fn test_export_skipped_for_empty_view() {
        let (dir, mut app) = app_with("Date,Category,Amount,Description\n");

        app.export();

        assert_eq!(app.status.as_ref().map(|(level, _)| *level), Some(Level::Warning));
        assert!(!dir.path().join(expense_ledger::EXPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_budget_never_negative() {
        let (_dir, mut app) = app_with(SAMPLE);

        app.adjust_budget(-5000.0);

        assert_eq!(app.budget, 0.0);
        assert_eq!(app.summary.budget_status, None);
    }

    #[test]
    fn test_percentage_bar() {
        assert_eq!(percentage_bar(50.0, 4), "██░░  50.0%");
    }
}
