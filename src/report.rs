use std::path::Path;

use anyhow::Context as _;

use crate::formats::{BookRecord, CrawlResult};

const HEADER_RULE_WIDTH: usize = 60;
const DIVIDER_WIDTH: usize = 40;

pub fn render(result: &CrawlResult) -> String {
    let mut out = format!(
        "Processed {} books\n{}\n\n",
        result.len(),
        "=".repeat(HEADER_RULE_WIDTH)
    );

    for (index, book) in result.iter().enumerate() {
        let number = index + 1;
        out.push_str(&format!("Book #{number}\n"));
        out.push_str(&render_book(book));
        if number < result.len() {
            out.push_str(&format!("\n{}\n\n", "-".repeat(DIVIDER_WIDTH)));
        }
    }

    out
}

pub fn render_book(book: &BookRecord) -> String {
    let mut out = format!(
        "Title: {}\nPrice: {}\nRating: {}\nIn stock: {}\nDescription: {}\n",
        book.title, book.price, book.rating, book.in_stock, book.description
    );
    if !book.product_info.is_empty() {
        out.push_str("Additional information:\n");
        for (key, value) in book.product_info.iter() {
            out.push_str(&format!("{key}: {value}\n"));
        }
    }
    out
}

/// Overwrites `path` with the rendered report, creating parent directories.
pub fn write(path: &Path, result: &CrawlResult) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create report dir: {}", parent.display()))?;
    }
    std::fs::write(path, render(result))
        .with_context(|| format!("write report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ProductInfo;

    fn book(title: &str, info: &[(&str, &str)]) -> BookRecord {
        let mut product_info = ProductInfo::new();
        for (key, value) in info {
            product_info.insert(*key, *value);
        }
        BookRecord {
            title: title.to_owned(),
            price: "£10.00".to_owned(),
            rating: "Two".to_owned(),
            in_stock: "In stock (1 available)".to_owned(),
            description: String::new(),
            product_info,
        }
    }

    #[test]
    fn renders_header_blocks_and_dividers() {
        let result = CrawlResult {
            books: vec![book("First", &[("UPC", "u1")]), book("Second", &[])],
        };

        let expected = format!(
            "Processed 2 books\n{}\n\n\
             Book #1\nTitle: First\nPrice: £10.00\nRating: Two\nIn stock: In stock (1 available)\n\
             Description: \nAdditional information:\nUPC: u1\n\
             \n{}\n\n\
             Book #2\nTitle: Second\nPrice: £10.00\nRating: Two\nIn stock: In stock (1 available)\n\
             Description: \n",
            "=".repeat(60),
            "-".repeat(40),
        );
        assert_eq!(render(&result), expected);
    }

    #[test]
    fn last_book_has_no_trailing_divider() {
        let result = CrawlResult {
            books: vec![book("Only", &[])],
        };
        assert!(!render(&result).contains(&"-".repeat(40)));
    }

    #[test]
    fn write_creates_parent_dirs_and_overwrites() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("artifacts").join("books_data.txt");

        write(&path, &CrawlResult { books: vec![book("One", &[])] })?;
        write(&path, &CrawlResult { books: vec![book("Two", &[]), book("Three", &[])] })?;

        let written = std::fs::read_to_string(&path)?;
        assert!(written.starts_with("Processed 2 books\n"));
        assert!(!written.contains("Title: One"));
        Ok(())
    }
}
