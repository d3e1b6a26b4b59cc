pub mod fetcher;
pub mod layout;
pub mod pagination;
pub mod safeway;
pub mod traits;
pub mod wegmans;

use crate::model::ScraperError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

pub use safeway::SafewayScraper;
pub use traits::{ScrapeContext, SiteScraper};
pub use wegmans::WegmansScraper;

/// Supported retailers. Adding a store means adding a variant and its
/// `SiteScraper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retailer {
    Wegmans,
    Safeway,
}

impl Retailer {
    pub fn scraper(self) -> Result<Box<dyn SiteScraper>, ScraperError> {
        Ok(match self {
            Retailer::Wegmans => Box::new(WegmansScraper::new()?),
            Retailer::Safeway => Box::new(SafewayScraper::new()?),
        })
    }

    pub fn default_categories(self) -> BTreeMap<String, String> {
        match self {
            Retailer::Wegmans => WegmansScraper::default_categories(),
            Retailer::Safeway => SafewayScraper::default_categories(),
        }
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retailer::Wegmans => write!(f, "wegmans"),
            Retailer::Safeway => write!(f, "safeway"),
        }
    }
}
