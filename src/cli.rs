use clap::{Args, Parser, Subcommand};

use crate::crawl::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_PATH};
use crate::schedule::DEFAULT_RUN_AT;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract a single book from its detail page.
    Book(BookArgs),
    /// Walk the whole catalog and extract every book.
    Crawl(CrawlArgs),
    /// Run a persisted crawl every day at a fixed time until interrupted.
    Schedule(ScheduleArgs),
}

#[derive(Debug, Args)]
pub struct BookArgs {
    /// Detail page URL (must be http/https).
    #[arg(long)]
    pub url: String,

    /// Print the record as JSON instead of the text block.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Catalog root URL; listing pages live under `catalogue/`.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Write the text report to `--out`.
    #[arg(long)]
    pub save: bool,

    /// Report path used with `--save`.
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub out: String,

    /// Delay between listing page fetches (politeness).
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,

    /// Print all records as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Local time of day (HH:MM) to start the daily crawl.
    #[arg(long, default_value = DEFAULT_RUN_AT)]
    pub at: String,

    /// Seconds between checks for a due run.
    #[arg(long, default_value_t = 60)]
    pub poll_secs: u64,

    /// Catalog root URL.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Report path written after every run.
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub out: String,

    /// Delay between listing page fetches (politeness).
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,
}
