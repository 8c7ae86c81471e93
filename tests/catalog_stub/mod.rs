use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// What a detail link on a listing page leads to.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Item {
    Book(String),
    Untitled,
    ServerError,
}

/// A synthetic catalog: listing pages of items, served under `/catalogue/`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pages: Vec<Vec<Item>>,
}

#[allow(dead_code)]
impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, items: Vec<Item>) -> Self {
        self.pages.push(items);
        self
    }

    /// `total` titled books spread over pages of `per_page`.
    pub fn uniform(total: usize, per_page: usize) -> Self {
        let mut catalog = Self::new();
        let mut next = 1;
        while next <= total {
            let last = (next + per_page - 1).min(total);
            catalog = catalog.page(
                (next..=last)
                    .map(|n| Item::Book(format!("Book {n}")))
                    .collect(),
            );
            next = last + 1;
        }
        catalog
    }

    fn routes(&self) -> HashMap<String, (u16, String)> {
        let mut routes = HashMap::new();
        let mut serial = 0_usize;

        for (index, items) in self.pages.iter().enumerate() {
            let page_number = index + 1;
            let mut listing = String::from("<!doctype html><html><body><section><ol class=\"row\">");

            for item in items {
                serial += 1;
                let slug = format!("item-{serial}_{serial}");
                listing.push_str(&format!(
                    r#"<li><article class="product_pod"><h3><a href="{slug}/index.html" title="t">t</a></h3><p class="price_color">£1.00</p></article></li>"#
                ));
                let detail = match item {
                    Item::Book(title) => (200, detail_page(title, serial)),
                    Item::Untitled => (200, "<html><body><p>gone</p></body></html>".to_owned()),
                    Item::ServerError => (500, "internal error".to_owned()),
                };
                routes.insert(format!("/catalogue/{slug}/index.html"), detail);
            }

            listing.push_str("</ol>");
            if page_number < self.pages.len() {
                listing.push_str(&format!(
                    r#"<ul class="pager"><li class="next"><a href="page-{}.html">next</a></li></ul>"#,
                    page_number + 1
                ));
            }
            listing.push_str("</section></body></html>");
            routes.insert(format!("/catalogue/page-{page_number}.html"), (200, listing));
        }

        routes
    }
}

fn detail_page(title: &str, serial: usize) -> String {
    format!(
        r#"<!doctype html>
<html>
  <body>
    <div class="product_main">
      <h1>{title}</h1>
      <p class="price_color">Â£{serial}.99</p>
      <p class="instock availability"><i class="icon-ok"></i> In stock ({serial} available)</p>
      <p class="star-rating Four"><i class="icon-star"></i></p>
    </div>
    <div id="product_description" class="sub-header"><h2>Product Description</h2></div>
    <p>About {title}.</p>
    <table class="table table-striped">
      <tr><th>UPC</th><td>upc-{serial}</td></tr>
      <tr><th>Price (incl. tax)</th><td>Â£{serial}.99</td></tr>
    </table>
  </body>
</html>
"#
    )
}

pub struct CatalogStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CatalogStub {
    pub fn spawn(catalog: Catalog) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start catalog stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/");
        let routes = catalog.routes();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url);
                let (status, body) = routes
                    .get(path)
                    .cloned()
                    .unwrap_or((404, "not found".to_owned()));

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"text/html; charset=utf-8"[..],
                )
                .expect("build header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for CatalogStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
