use axum::{Json, Router, response::IntoResponse, routing::get};
use chrono::Utc;
use clap::{Parser, Subcommand};
use common::{AppState, Config};
use database::Database;
use ledger::import::parse_legacy_csv;
use ledger::SqliteLedgerStore;
use notifier::{LogNotifier, Notifier, TelegramNotifier};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transactions::service::TransactionService;

#[derive(Parser)]
#[command(version, about = "Daily budget tracker fed by bank notifications")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Print the current budget state as JSON
    Status,
    /// Append rows from a legacy spreadsheet CSV export
    Import { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load Config from .env, environment and CLI args
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.config;

    // 3. Initialize the ledger
    let db = Database::new(&config.database_url, config.store_timeout()).await?;
    db.run_migrations().await?;
    let ledger = Arc::new(SqliteLedgerStore::open(db).await?);

    let notifier: Arc<dyn Notifier> = match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Arc::new(TelegramNotifier::new(token, chat_id.clone(), config.notify_timeout())?),
        _ => {
            tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, reports go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let state = Arc::new(AppState::new(config.clone(), ledger, notifier)?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state).await,
        Commands::Status => {
            let budget = TransactionService::status(&state, Utc::now()).await;
            println!("{}", serde_json::to_string_pretty(&budget)?);
            Ok(())
        }
        Commands::Import { path } => import(&state, &path).await,
    }
}

async fn serve(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    // 4. Routing
    let mut app = Router::<Arc<AppState>>::new()
        .route("/", get(health))
        .merge(transactions::handler::transactions_router(state.clone()));

    if state.config.tg_secret_path.is_some() {
        app = app.merge(bot::bot_router(state.clone()));
    } else {
        tracing::warn!("TG_SECRET_PATH is not set! The Telegram webhook is DISABLED.");
    }

    let app = app.with_state(state.clone()).layer(TraceLayer::new_for_http());

    // 5. Start Server
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn import(state: &AppState, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    let parsed = parse_legacy_csv(file)?;

    for (line, reason) in &parsed.rejected {
        tracing::warn!(line, "Skipping row: {}", reason);
    }

    let summary = TransactionService::import_rows(state, parsed.rows).await?;
    tracing::info!(
        imported = summary.imported,
        duplicates = summary.duplicates,
        rejected = parsed.rejected.len(),
        "Import finished"
    );
    println!(
        "imported {}, skipped {} duplicates, rejected {} malformed rows",
        summary.imported,
        summary.duplicates,
        parsed.rejected.len()
    );

    Ok(())
}
