use super::layout::{LayoutSpec, SiteLayout};
use super::traits::SiteScraper;
use crate::model::ScraperError;
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://www.safeway.com";

const CATEGORIES: &[(&str, &str)] = &[
    ("meat", "https://www.safeway.com/shop/aisles/meat-seafood.html"),
    ("produce", "https://www.safeway.com/shop/aisles/fruits-vegetables.html"),
    ("dairy", "https://www.safeway.com/shop/aisles/dairy-eggs-cheese.html"),
];

pub struct SafewayScraper {
    layout: SiteLayout,
}

impl SafewayScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let layout = SiteLayout::new(LayoutSpec {
            store_name: "Safeway",
            base_url: BASE_URL,
            container: "div.product-grid",
            item: "product-item-v2",
            name_link: "a[data-qa='prd-itm-pttl']",
            image: "picture img",
            price_text: "span.product-price__unit-price",
            price_pattern: r"^\$[\d.]+ ?/ ?(lb|oz|ea)$",
            price_value: "input.product-price__value",
            load_more: "div.load-more-container button.bloom-load-button",
        })?;
        Ok(Self { layout })
    }

    pub fn default_categories() -> BTreeMap<String, String> {
        CATEGORIES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl SiteScraper for SafewayScraper {
    fn layout(&self) -> &SiteLayout {
        &self.layout
    }
}
