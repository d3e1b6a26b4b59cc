// Core structs: ProductRecord, CatalogProduct, CatalogEntry, error types
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// One product cell as extracted from a retailer page.
///
/// Fields that could not be extracted stay `None` so the miss is visible to
/// the reconciler's validation gate instead of being dropped at scrape time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product_name: Option<String>,
    pub store_name: String,
    pub product_price: Option<String>,
    pub product_link: Option<String>,
    pub product_image: Option<String>,
}

/// A product with every required field present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_name: String,
    pub store_name: String,
    pub product_price: String,
    pub product_link: String,
    pub product_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub product: CatalogProduct,
    pub last_seen: DateTime<Utc>,
}

/// Category key -> products, or `None` when the category's page could not be
/// located or its scrape failed.
pub type ScrapeBatch = BTreeMap<String, Option<Vec<ProductRecord>>>;

impl ProductRecord {
    /// Checks field completeness and returns the persistable form.
    pub fn validate(&self) -> Result<CatalogProduct, ValidationError> {
        fn required(value: Option<&str>, field: &'static str) -> Result<String, ValidationError> {
            match value.map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(ValidationError::MissingField(field)),
            }
        }

        Ok(CatalogProduct {
            product_name: required(self.product_name.as_deref(), "productName")?,
            store_name: required(Some(&self.store_name), "storeName")?,
            product_price: required(self.product_price.as_deref(), "productPrice")?,
            product_link: required(self.product_link.as_deref(), "productLink")?,
            product_image: required(self.product_image.as_deref(), "productImage")?,
        })
    }
}

impl CatalogProduct {
    /// True when the mutable fields (price, link, image) match.
    pub fn same_listing(&self, other: &CatalogProduct) -> bool {
        self.product_price == other.product_price
            && self.product_link == other.product_link
            && self.product_image == other.product_image
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {secs}s")]
    NavigationTimeout { url: String, secs: u64 },

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid price pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("scrape of {url} exceeded {secs}s")]
    CategoryTimeout { url: String, secs: u64 },

    #[error("scrape cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid timestamp in catalog: {0}")]
    InvalidTimestamp(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
pub(crate) fn record(name: &str, price: &str) -> ProductRecord {
    ProductRecord {
        product_name: Some(name.to_string()),
        store_name: "Wegmans".to_string(),
        product_price: Some(price.to_string()),
        product_link: Some(format!("https://shop.example.com/p/{}", name.len())),
        product_image: Some("https://img.example.com/a.jpg".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_record_validates_trimmed() {
        let mut r = record("Bananas", "$0.69/lb");
        r.product_name = Some("  Bananas ".into());
        let product = r.validate().unwrap();
        assert_eq!(product.product_name, "Bananas");
        assert_eq!(product.product_price, "$0.69/lb");
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let mut r = record("Bananas", "$0.69/lb");
        r.product_image = None;
        assert_eq!(r.validate(), Err(ValidationError::MissingField("productImage")));

        let mut r = record("Bananas", "$0.69/lb");
        r.product_price = Some("   ".into());
        assert_eq!(r.validate(), Err(ValidationError::MissingField("productPrice")));

        let mut r = record("Bananas", "$0.69/lb");
        r.store_name = String::new();
        assert_eq!(r.validate(), Err(ValidationError::MissingField("storeName")));
    }

    #[test]
    fn batch_serializes_with_camel_case_and_null_categories() {
        let mut batch = ScrapeBatch::new();
        batch.insert("meat".into(), None);
        batch.insert("produce".into(), Some(vec![record("Kale", "$1.99")]));

        let json = serde_json::to_value(&batch).unwrap();
        assert!(json["meat"].is_null());
        assert_eq!(json["produce"][0]["productName"], "Kale");
        assert_eq!(json["produce"][0]["storeName"], "Wegmans");
    }
}
