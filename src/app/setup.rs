//! This module handles the initial setup of the application.
use super::args::AppArgs;
use crate::analysis::LogAnalyzer;
use crate::config::Config;
use crate::logging::{is_external_event, LogBuffer, LogCaptureLayer};
use crate::storage::{LayeredEntryStore, SledEntryStore};
use crate::types::LogEntry;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};
use tracing_subscriber::{
    filter::filter_fn, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

const DEFAULT_LOG_FILTER: &str = "info,dayboard_log_review=debug";

/// Contains all the components a subcommand needs.
///
/// This struct is created by the `prepare` function and passed to the
/// subcommand being run.
pub struct PreparedApp {
    /// The command-line arguments.
    pub args: AppArgs,
    /// The loaded configuration.
    pub config: Config,
    /// The in-memory buffer fed by the capture layer.
    pub buffer: Arc<LogBuffer>,
    /// The persisted entry table.
    pub store: SledEntryStore,
    /// The analyzer reading the persisted table plus the buffer.
    pub analyzer: Arc<LogAnalyzer>,
}

/// Prepares the application for running.
///
/// This function performs the following steps:
/// 1. Loads and validates the configuration.
/// 2. Creates the capture buffer and configures logging.
/// 3. Creates the data directory and opens the database.
/// 4. Starts persisting captured entries.
/// 5. Builds the analyzer over the layered store.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// This function will return an error if any of the setup steps fail.
pub fn prepare(args: AppArgs) -> Result<PreparedApp> {
    let config = Config::load(args.config.as_deref().map(Path::new))?;

    let buffer = Arc::new(LogBuffer::new(config.store.buffer_capacity));
    configure_logging(buffer.clone());

    std::fs::create_dir_all(&args.data_dir)?;
    let db_path = format!("{}/db", args.data_dir);
    let db = sled::open(&db_path)?;
    let store = SledEntryStore::new(db)?;
    debug!("Opened log store at {} with {} entries", db_path, store.len());

    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    buffer.set_persist_sender(persist_tx);
    spawn_persister(store.clone(), persist_rx);

    let layered = LayeredEntryStore::new(
        Arc::new(store.clone()),
        buffer.clone(),
        config.store.retrieval_timeout(),
    );
    let analyzer = Arc::new(LogAnalyzer::new(
        Arc::new(layered),
        config.analysis.clone(),
    ));

    Ok(PreparedApp {
        args,
        config,
        buffer,
        store,
        analyzer,
    })
}

/// Configures logging for the application.
///
/// Events go to stderr. Events from outside this crate also go into the
/// capture buffer. `RUST_LOG` overrides the default filter.
fn configure_logging(buffer: Arc<LogBuffer>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(LogCaptureLayer::new(buffer).with_filter(filter_fn(is_external_event)))
        .try_init();
}

/// Writes batches of captured entries to the persisted store.
fn spawn_persister(store: SledEntryStore, mut persist_rx: mpsc::UnboundedReceiver<Vec<LogEntry>>) {
    tokio::spawn(async move {
        while let Some(batch) = persist_rx.recv().await {
            if let Err(e) = store.append_batch(&batch).await {
                // Logging here would feed the failure back into the same batch.
                eprintln!("Failed to persist {} log entries: {}", batch.len(), e);
            }
        }
    });
}
