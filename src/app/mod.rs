pub mod args;
mod commands;
mod render;
mod setup;

pub use args::{AppArgs, Command};
pub use commands::parse_json_lines;
pub use render::{render_analysis, render_entry, render_headline};

use anyhow::Result;

pub async fn launch() -> Result<()> {
    launch_with_args(AppArgs::from_cli()).await
}

pub async fn launch_with_args(args: AppArgs) -> Result<()> {
    let command = args.command.clone();
    let app = setup::prepare(args)?;

    match command {
        Command::Analyze {
            window,
            session,
            json,
        } => commands::analyze(&app, window, session.as_deref(), json).await,
        Command::Logs {
            level,
            window,
            json,
        } => commands::logs(&app, &level, window, json).await,
        Command::Review { interval, window } => commands::review(&app, interval, window).await,
        Command::Ingest { file } => commands::ingest(&app, &file).await,
        Command::Prune { max_age_hours } => commands::prune(&app, max_age_hours).await,
        Command::Serve { port } => commands::serve(&app, port).await,
    }
}
