use std::env;
use std::io::{stderr, stdout, BufWriter};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use transaction_sync_engine::categorization::CategorizationService;
use transaction_sync_engine::config::SyncConfig;
use transaction_sync_engine::events::{EventSink, TracingEventSink};
use transaction_sync_engine::import::ImportService;
use transaction_sync_engine::models::SourceAccount;
use transaction_sync_engine::ports::{CsvStatementProvider, RuleCategorizer};
use transaction_sync_engine::storage::{Repositories, TransactionFilter};

const CONFIG_ENV: &str = "TRANSACTION_SYNC_CONFIG";
const REPORT_HEADER: [&str; 8] = ["transaction", "date", "amount", "currency", "status", "category", "payee", "confidence"];

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 6 {
        eprintln!("Usage: transaction-sync-engine [statement].csv [account] [bank] [start:YYYY-MM-DD] [end:YYYY-MM-DD] [log_level:optional] > [report].csv");
        eprintln!("Available log levels: error, warn, info, debug, trace (default: error)");
        eprintln!("Set {CONFIG_ENV} to the path of a TOML config to override the defaults");
        exit(1);
    }

    let log_level = args.get(6)
        .map(|s| parse_log_level(s)).unwrap_or(LevelFilter::ERROR);

    setup_logging(log_level);

    let config = Arc::new(load_config()?);
    let account = SourceAccount::new(&args[2], &args[3]);
    let start = parse_date(&args[4])?;
    let end = parse_date(&args[5])?;

    let repositories = Repositories::in_memory();

    repositories.seed_categories(&config.categories)?;

    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
    let provider = Arc::new(CsvStatementProvider::new(&args[1]));
    let categorizer = Arc::new(RuleCategorizer::new(config.rules.clone())?);

    let importer = ImportService::new(provider, repositories.clone(), events.clone(), config.clone());
    let categorization = CategorizationService::new(categorizer, repositories.clone(), events, config);

    let timer = Instant::now();

    let batch = importer.import_transactions(&account, start, end).await?;
    let summary = categorization.categorize_pending(Some(&account.id)).await?;

    info!(
        "Import [{}] stored {} transactions and categorized {} in {:?}",
        batch.id, batch.transaction_count, summary.categorized_count, timer.elapsed()
    );

    write_report_to_stdout(&repositories, &account)?;

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'error'", level);
            LevelFilter::ERROR
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    value.parse::<NaiveDate>()
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

fn load_config() -> Result<SyncConfig> {
    match env::var_os(CONFIG_ENV) {
        Some(path) => Ok(SyncConfig::load(&PathBuf::from(path))?),
        None => Ok(SyncConfig::default())
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: The report goes to stdout, so logging has to use stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn write_report_to_stdout(repositories: &Repositories, account: &SourceAccount) -> Result<()> {
    let mut output = csv::Writer::from_writer(BufWriter::new(stdout().lock()));

    output.write_record(REPORT_HEADER)?;

    let filter = TransactionFilter {
        account_id: Some(account.id.clone()),
        ..TransactionFilter::default()
    };

    for transaction in repositories.transactions.find(&filter)? {
        let state = repositories.states.load(&transaction.id)?;

        let status = state.as_ref().map(|state| state.status().to_string()).unwrap_or_default();
        let category = state.as_ref().and_then(|state| state.effective_category_id()).unwrap_or_default().to_string();
        let payee = state.as_ref().and_then(|state| state.effective_payee()).unwrap_or_default().to_string();
        let confidence = state.as_ref().and_then(|state| state.confidence()).map(|score| score.to_string()).unwrap_or_default();

        output.write_record([
            transaction.id.provider_id().to_string(),
            transaction.date.to_string(),
            format!("{:.2}", transaction.amount.amount()),
            transaction.amount.currency().to_string(),
            status,
            category,
            payee,
            confidence
        ])?;
    }

    output.flush()?;

    Ok(())
}
