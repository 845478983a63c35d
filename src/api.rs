// Expense Ledger - HTTP API
// JSON endpoints over the shared ledger store (axum)

use crate::aggregate::{available_categories, available_months, filter, Selection, Summary};
use crate::config::parse_budget;
use crate::errors::{ImportError, LedgerError};
use crate::export::{export_xlsx, EXPORT_FILE_NAME, XLSX_MIME};
use crate::parser::{import_into, ImportPolicy, ImportReport};
use crate::record::{Category, ExpenseForm, ExpenseRecord};
use crate::store::LedgerStore;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<LedgerStore>>,
    /// Budget used by `/api/summary` when the request does not carry one.
    pub budget: f64,
}

impl AppState {
    pub fn new(store: LedgerStore, budget: f64) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            budget,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::internal("ledger lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

/// Handler failure rendered as an `ApiResponse` with `success: false`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::err(self.message))).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        error!(error = %err, "ledger operation failed");
        Self::internal(err.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingColumns(_) | ImportError::Csv(_) => Self::bad_request(err.to_string()),
            ImportError::WouldEmptyLedger { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            ImportError::Ledger(inner) => inner.into(),
        }
    }
}

// ============================================================================
// Query parameters
// ============================================================================

/// `?month=YYYY-MM&category=Food&budget=1000`; absent filters mean "All".
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub month: Option<String>,
    pub category: Option<String>,
    pub budget: Option<String>,
}

impl ViewQuery {
    fn selections(&self) -> (Selection, Selection) {
        (
            Selection::parse(self.month.as_deref()),
            Selection::parse(self.category.as_deref()),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub policy: ImportPolicy,
}

/// Keys available to the filter controls.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterOptions {
    pub months: Vec<String>,
    pub categories: Vec<String>,
    /// Categories offered by the entry form.
    pub form_categories: Vec<String>,
}

fn load_view(state: &AppState, query: &ViewQuery) -> Result<Vec<ExpenseRecord>, ApiError> {
    let snapshot = state.lock()?.snapshot()?;
    let (month, category) = query.selections();
    Ok(filter(&snapshot, &month, &category))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/expenses - Filtered expense records
async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ApiResponse<Vec<ExpenseRecord>>>, ApiError> {
    let records = load_view(&state, &query)?;
    Ok(Json(ApiResponse::ok(records)))
}

/// POST /api/expenses - Append one expense from the entry form
async fn add_expense(
    State(state): State<AppState>,
    Json(form): Json<ExpenseForm>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseRecord>>), ApiError> {
    form.validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    if form.amount < 0.0 {
        return Err(ApiError::bad_request("Amount must be zero or more"));
    }

    let record = form.into_record();
    state.lock()?.append(record.clone())?;
    info!(category = %record.category, amount = record.amount, "expense added");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// POST /api/import - Replace the ledger with an uploaded CSV body
async fn import_csv(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let mut store = state.lock()?;
    let report = import_into(&mut store, body.as_ref(), query.policy)?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/summary - Metrics, breakdown, trend and budget status
async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ApiResponse<Summary>>, ApiError> {
    let budget = match query.budget.as_deref() {
        Some(raw) => parse_budget(raw).map_err(ApiError::bad_request)?,
        None => state.budget,
    };

    let records = load_view(&state, &query)?;
    Ok(Json(ApiResponse::ok(Summary::compute(&records, budget))))
}

/// GET /api/filters - Months and categories present in the ledger
async fn get_filters(State(state): State<AppState>) -> Result<Json<ApiResponse<FilterOptions>>, ApiError> {
    let snapshot = state.lock()?.snapshot()?;

    let options = FilterOptions {
        months: available_months(&snapshot),
        categories: available_categories(&snapshot),
        form_categories: Category::ALL.iter().map(|c| c.to_string()).collect(),
    };
    Ok(Json(ApiResponse::ok(options)))
}

/// GET /api/export - Filtered view as Expense_Report.xlsx (204 when empty)
async fn export_report(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let records = load_view(&state, &query)?;

    let Some(bytes) = export_xlsx(&records)? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let headers = [
        (header::CONTENT_TYPE, XLSX_MIME.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Routes under `/api`, bound to `state`.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/expenses", get(list_expenses).post(add_expense))
        .route("/import", post(import_csv))
        .route("/summary", get(get_summary))
        .route("/filters", get(get_filters))
        .route("/export", get(export_report))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}
