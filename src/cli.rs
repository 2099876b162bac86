use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "capture-index")]
#[command(about = "Browse day-partitioned capture artifacts by event", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List one page of capture events for a collection
    Page {
        collection: String,
        /// Number of events on the page
        #[arg(short, long, default_value_t = 1)]
        count: usize,
        /// Cursor or timestamp to start from (epoch seconds or ISO-8601)
        #[arg(short, long)]
        anchor: Option<String>,
        /// Skip the event named by the anchor instead of including it
        #[arg(long)]
        exclusive: bool,
        /// Print a coloured listing instead of JSON
        #[arg(long)]
        human: bool,
    },
    /// List configured collections
    Collections,
    /// Print the storage path of one artifact
    Resolve {
        collection: String,
        year: String,
        month: String,
        day: String,
        file_name: String,
    },
    /// Print configuration values
    PrintConfig,
}
