use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context as _;
use scraper::{Html, Selector};
use url::Url;

use crate::extract::selector;
use crate::fetch::PageSource;

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);
const CATALOGUE_PREFIX: &str = "catalogue/";

static ITEM: LazyLock<Selector> = LazyLock::new(|| selector("article.product_pod"));
static ITEM_LINK: LazyLock<Selector> = LazyLock::new(|| selector("h3 a[href]"));
static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| selector("li.next"));

/// Item links and pagination state of one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub items: Vec<Url>,
    pub has_next: bool,
}

/// Ensures `base` behaves as a directory when relative paths are joined onto it.
pub fn normalize_base(base: &Url) -> Url {
    let mut base = base.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

pub fn listing_url(base: &Url, page: usize) -> anyhow::Result<Url> {
    base.join(&format!("{CATALOGUE_PREFIX}page-{page}.html"))
        .with_context(|| format!("build listing url for page {page}"))
}

pub fn detail_url(base: &Url, href: &str) -> anyhow::Result<Url> {
    let relative = if href.starts_with(CATALOGUE_PREFIX) {
        href.to_owned()
    } else {
        format!("{CATALOGUE_PREFIX}{href}")
    };
    base.join(&relative)
        .with_context(|| format!("resolve item link: {href}"))
}

pub fn parse_listing(document: &Html, base: &Url) -> CatalogPage {
    let items = document
        .select(&ITEM)
        .filter_map(|item| {
            let href = item.select(&ITEM_LINK).next()?.value().attr("href")?;
            match detail_url(base, href) {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::debug!(href, ?err, "skipping unresolvable item link");
                    None
                }
            }
        })
        .collect();

    CatalogPage {
        items,
        has_next: document.select(&NEXT_PAGE).next().is_some(),
    }
}

/// Starts a fresh traversal from page 1.
pub fn walk<'a, S: PageSource + ?Sized>(
    source: &'a S,
    base: &Url,
    page_delay: Duration,
) -> CatalogWalker<'a, S> {
    CatalogWalker::new(source, base, page_delay)
}

/// Lazily yields detail-page URLs, fetching one listing page at a time.
///
/// A listing-page failure is yielded once as `Err` and ends the walk.
pub struct CatalogWalker<'a, S: ?Sized> {
    source: &'a S,
    base: Url,
    page_delay: Duration,
    next_page: usize,
    pending: VecDeque<Url>,
    fetched_any: bool,
    done: bool,
}

impl<'a, S: PageSource + ?Sized> CatalogWalker<'a, S> {
    pub fn new(source: &'a S, base: &Url, page_delay: Duration) -> Self {
        Self {
            source,
            base: normalize_base(base),
            page_delay,
            next_page: 1,
            pending: VecDeque::new(),
            fetched_any: false,
            done: false,
        }
    }

    fn load_next_page(&mut self) -> anyhow::Result<()> {
        if self.fetched_any && !self.page_delay.is_zero() {
            std::thread::sleep(self.page_delay);
        }
        self.fetched_any = true;

        let page = self.next_page;
        let url = listing_url(&self.base, page)?;
        let html = self
            .source
            .fetch(&url)
            .with_context(|| format!("fetch listing page {page}"))?;
        let listing = parse_listing(&Html::parse_document(&html), &self.base);
        tracing::debug!(
            page,
            items = listing.items.len(),
            has_next = listing.has_next,
            "parsed listing page"
        );

        if listing.items.is_empty() {
            self.done = true;
            return Ok(());
        }

        self.pending.extend(listing.items);
        if listing.has_next {
            self.next_page += 1;
        } else {
            self.done = true;
        }
        Ok(())
    }
}

impl<S: PageSource + ?Sized> Iterator for CatalogWalker<'_, S> {
    type Item = anyhow::Result<Url>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(url) = self.pending.pop_front() {
                return Some(Ok(url));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.load_next_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}
