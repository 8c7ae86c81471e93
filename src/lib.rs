#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod report;
pub mod schedule;

pub use crawl::scrape_books;
pub use extract::get_book;
pub use schedule::start;
