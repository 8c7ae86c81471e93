use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::catalog::{self, DEFAULT_PAGE_DELAY};
use crate::cli::CrawlArgs;
use crate::extract::try_fetch_book;
use crate::fetch::{HttpPageSource, PageSource};
use crate::formats::CrawlResult;

pub const DEFAULT_BASE_URL: &str = "http://books.toscrape.com/";
pub const DEFAULT_OUTPUT_PATH: &str = "artifacts/books_data.txt";

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub base_url: Url,
    /// Write the report to `output` when at least one book was collected.
    pub persist: bool,
    pub output: PathBuf,
    /// Pause between listing-page fetches.
    pub page_delay: Duration,
}

impl CrawlOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            persist: false,
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }
}

pub fn parse_http_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid url: {raw}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("url must be http/https: {url}");
    }
    Ok(url)
}

pub fn run(args: CrawlArgs) -> anyhow::Result<()> {
    let base_url = parse_http_url(&args.base_url).context("parse --base-url")?;
    let options = CrawlOptions::new(base_url)
        .persist(args.save)
        .output(&args.out)
        .page_delay(Duration::from_millis(args.delay_ms));

    let source = HttpPageSource::new()?;
    let result = crawl(&source, &options)?;

    if args.json {
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &result).context("serialize crawl json")?;
        writeln!(stdout).context("write stdout")?;
    } else {
        println!("Processed {} books", result.len());
    }
    Ok(())
}

/// Full-crawl entry point over HTTP with the default report location.
pub fn scrape_books(base_url: &str, persist: bool) -> anyhow::Result<CrawlResult> {
    let base_url = parse_http_url(base_url)?;
    let source = HttpPageSource::new()?;
    crawl(&source, &CrawlOptions::new(base_url).persist(persist))
}

/// Walks the catalog and extracts every item in traversal order.
///
/// Failures on individual detail pages are logged and skipped; a listing-page
/// failure aborts the crawl.
pub fn crawl<S: PageSource + ?Sized>(
    source: &S,
    options: &CrawlOptions,
) -> anyhow::Result<CrawlResult> {
    tracing::info!(base_url = %options.base_url, "starting crawl");

    let mut result = CrawlResult::default();
    let mut skipped = 0_usize;

    for item in catalog::walk(source, &options.base_url, options.page_delay) {
        let url = item.context("walk catalog")?;

        match try_fetch_book(source, &url) {
            Ok(book) if book.is_listable() => result.push(book),
            Ok(_) => {
                tracing::debug!(url = %url, "discarding page without title");
                skipped += 1;
            }
            Err(err) => {
                tracing::warn!(url = %url, ?err, "skipping book after fetch failure");
                skipped += 1;
            }
        }
    }

    tracing::info!(books = result.len(), skipped, "crawl finished");

    if options.persist && !result.is_empty() {
        match crate::report::write(&options.output, &result) {
            Ok(()) => tracing::info!(path = %options.output.display(), "saved crawl report"),
            Err(err) => {
                tracing::error!(path = %options.output.display(), ?err, "failed to save crawl report");
            }
        }
    }

    Ok(result)
}
