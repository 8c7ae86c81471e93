use std::io::Write as _;
use std::sync::LazyLock;

use anyhow::Context as _;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::cli::BookArgs;
use crate::fetch::{HttpPageSource, PageSource};
use crate::formats::{BookRecord, ProductInfo};

/// Left behind when a UTF-8 non-breaking space before `£` is decoded as Latin-1.
const CURRENCY_ARTIFACT: char = 'Â';
const RATING_MARKER: &str = "star-rating";

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector(".price_color"));
static RATING: LazyLock<Selector> = LazyLock::new(|| selector(".star-rating"));
static IN_STOCK: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class="instock availability"]"#));
static DESCRIPTION_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| selector("#product_description"));
static PRODUCT_TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.table-striped"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static VALUE_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid built-in selector {css:?}: {err}"))
}

pub fn run(args: BookArgs) -> anyhow::Result<()> {
    let url = crate::crawl::parse_http_url(&args.url).context("parse --url")?;
    let source = HttpPageSource::new()?;
    let book = fetch_book(&source, &url);

    let mut stdout = std::io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &book).context("serialize book json")?;
        writeln!(stdout).context("write stdout")?;
    } else {
        stdout
            .write_all(crate::report::render_book(&book).as_bytes())
            .context("write stdout")?;
    }
    Ok(())
}

/// Single-item entry point: fetch one detail page over HTTP and extract it.
///
/// Never fails; a bad URL or transport error yields the empty record.
pub fn get_book(url: &str) -> BookRecord {
    let url = match Url::parse(url) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(url, %err, "invalid book url");
            return BookRecord::default();
        }
    };
    match HttpPageSource::new() {
        Ok(source) => fetch_book(&source, &url),
        Err(err) => {
            tracing::error!(?err, "http client unavailable");
            BookRecord::default()
        }
    }
}

pub fn fetch_book<S: PageSource + ?Sized>(source: &S, url: &Url) -> BookRecord {
    match try_fetch_book(source, url) {
        Ok(book) => book,
        Err(err) => {
            tracing::warn!(url = %url, ?err, "failed to fetch book page");
            BookRecord::default()
        }
    }
}

pub fn try_fetch_book<S: PageSource + ?Sized>(source: &S, url: &Url) -> anyhow::Result<BookRecord> {
    let html = source.fetch(url)?;
    Ok(extract_html(&html))
}

pub fn extract_html(html: &str) -> BookRecord {
    extract(&Html::parse_document(html))
}

/// Reads every field independently; a missing region only empties its own field.
pub fn extract(document: &Html) -> BookRecord {
    BookRecord {
        title: first_text(document, &TITLE),
        price: strip_currency_artifact(&first_text(document, &PRICE)),
        rating: rating(document),
        in_stock: first_text(document, &IN_STOCK),
        description: description(document),
        product_info: product_info(document),
    }
}

fn first<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    document.select(selector).next()
}

fn first_text(document: &Html, selector: &Selector) -> String {
    first(document, selector).map_or_else(String::new, text_of)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn strip_currency_artifact(value: &str) -> String {
    value.replace(CURRENCY_ARTIFACT, "")
}

fn rating(document: &Html) -> String {
    first(document, &RATING)
        .and_then(|el| el.value().attr("class"))
        .and_then(|classes| {
            classes
                .split_whitespace()
                .find(|class| *class != RATING_MARKER)
                .map(str::to_owned)
        })
        .unwrap_or_default()
}

fn description(document: &Html) -> String {
    first(document, &DESCRIPTION_ANCHOR)
        .and_then(|anchor| {
            anchor
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "p")
        })
        .map_or_else(String::new, text_of)
}

fn product_info(document: &Html) -> ProductInfo {
    let mut info = ProductInfo::new();
    let Some(table) = first(document, &PRODUCT_TABLE) else {
        return info;
    };

    for row in table.select(&ROW) {
        let (Some(header), Some(value)) = (
            row.select(&HEADER_CELL).next(),
            row.select(&VALUE_CELL).next(),
        ) else {
            continue;
        };

        let header = text_of(header);
        let mut value = text_of(value);
        if header.contains("Price") || header.contains("Tax") {
            value = strip_currency_artifact(&value);
        }
        info.insert(header, value);
    }

    info
}
