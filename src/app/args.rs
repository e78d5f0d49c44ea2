use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "dayboard-log-review")]
#[command(about = "Reviews Dayboard application logs: summaries, auth issues, repeated errors and health")]
pub struct AppArgs {
    #[arg(long, global = true, default_value = "data", help = "Data directory")]
    pub data_dir: String,

    #[arg(long, global = true, help = "Config file path")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze the trailing window and print a report.
    Analyze {
        #[arg(long, help = "Window in minutes (defaults to the configured window)")]
        window: Option<u32>,

        #[arg(long, help = "Only analyze entries from this session")]
        session: Option<String>,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },

    /// List entries in the window, newest first.
    Logs {
        #[arg(long, default_value = "all", help = "Level to show (error, warn, info, debug or all)")]
        level: String,

        #[arg(long, help = "Window in minutes (defaults to the configured window)")]
        window: Option<u32>,

        #[arg(long, help = "Print entries as JSON")]
        json: bool,
    },

    /// Re-run the analysis on a fixed interval until interrupted.
    Review {
        #[arg(long, help = "Minutes between analyses")]
        interval: Option<u32>,

        #[arg(long, help = "Window in minutes for each analysis")]
        window: Option<u32>,
    },

    /// Import JSON-lines log entries into the persisted store.
    Ingest {
        #[arg(help = "File with one JSON log entry per line")]
        file: String,
    },

    /// Delete persisted entries older than the retention period.
    Prune {
        #[arg(long, help = "Maximum entry age in hours (defaults to the configured retention)")]
        max_age_hours: Option<u64>,
    },

    /// Serve the dashboard JSON API.
    Serve {
        #[arg(long, help = "Port to listen on")]
        port: Option<u16>,
    },
}

impl AppArgs {
    pub fn from_cli() -> Self {
        <Self as Parser>::parse()
    }
}
