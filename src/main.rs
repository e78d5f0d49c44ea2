//! The main entry point for the dayboard log review tool.
use anyhow::Result;

/// The main function of the application.
///
/// Parses the command line, prepares the stores and logging, and runs the
/// selected subcommand.
///
/// # Errors
///
/// Returns an error if setup fails or the subcommand reports a failure.
#[tokio::main]
async fn main() -> Result<()> {
    dayboard_log_review::app::launch().await
}
