use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::{Deserialize, Deserializer};

/// One catalog item as read from its detail page.
///
/// Every field is always present; anything the page did not provide is an
/// empty string (or an empty `product_info`).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub price: String,
    pub rating: String,
    pub in_stock: String,
    pub description: String,
    pub product_info: ProductInfo,
}

impl BookRecord {
    /// Records without a title are not real items and never reach a crawl result.
    pub fn is_listable(&self) -> bool {
        !self.title.is_empty()
    }
}

/// Ordered label/value pairs from the product information table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInfo {
    entries: Vec<(String, String)>,
}

impl ProductInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repeated label keeps its first position and takes the latest value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ProductInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProductInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = ProductInfo;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of product information labels to values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut info = ProductInfo::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    info.insert(key, value);
                }
                Ok(info)
            }
        }

        deserializer.deserialize_map(Visitor)
    }
}

/// Books collected by one crawl, in catalog traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CrawlResult {
    pub books: Vec<BookRecord>,
}

impl CrawlResult {
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BookRecord> {
        self.books.iter()
    }

    pub(crate) fn push(&mut self, book: BookRecord) {
        self.books.push(book);
    }
}
