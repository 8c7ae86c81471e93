use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where listing and detail pages come from.
pub trait PageSource {
    fn fetch(&self, url: &Url) -> anyhow::Result<String>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch(&self, url: &Url) -> anyhow::Result<String> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP source sharing one pooled client across requests.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::blocking::Client,
}

impl HttpPageSource {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, url: &Url) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, concat!("bookscrape/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;

        response
            .text()
            .with_context(|| format!("read response body: {url}"))
    }
}
