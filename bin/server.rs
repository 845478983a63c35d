// Expense Ledger - Web Server
// REST API with Axum over the CSV ledger

use anyhow::{Context, Result};
use clap::Parser;
use expense_ledger::api::{router, AppState};
use expense_ledger::{init_tracing, LedgerStore, Settings};
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "expense-server", version, about = "HTTP API for the expense ledger")]
struct ServerArgs {
    #[command(flatten)]
    settings: Settings,

    /// Address to listen on.
    #[arg(long, env = "EXPENSE_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    init_tracing();

    println!("🌐 Expense Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut store = LedgerStore::open(&args.settings.ledger);
    let rows = store
        .load()
        .with_context(|| format!("Failed to open ledger: {}", args.settings.ledger.display()))?
        .len();
    println!("✓ Ledger opened: {} ({} rows)", args.settings.ledger.display(), rows);

    let state = AppState::new(store, args.settings.budget);
    let app = router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;
    info!(addr = %args.addr, "listening");

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/expenses", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;
    Ok(())
}
