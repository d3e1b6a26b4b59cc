use super::layout::{LayoutSpec, SiteLayout};
use super::traits::SiteScraper;
use crate::model::ScraperError;
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://shop.wegmans.com";

const CATEGORIES: &[(&str, &str)] = &[
    ("meat", "https://shop.wegmans.com/shop/categories/1003"),
    ("produce", "https://shop.wegmans.com/shop/categories/1004"),
    ("seafood", "https://shop.wegmans.com/shop/categories/1005"),
];

pub struct WegmansScraper {
    layout: SiteLayout,
}

impl WegmansScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let layout = SiteLayout::new(LayoutSpec {
            store_name: "Wegmans",
            base_url: BASE_URL,
            container: "div[data-testid='product-grid']",
            item: "div.product-cell",
            name_link: "a.product-cell-link",
            image: "img.product-image",
            price_text: "span.css-zqx11d",
            price_pattern: r"^\$[\d.]+/lb$",
            price_value: "data.product-price",
            load_more: "div[data-testid='pagination'] button.load-more-button",
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

impl SiteScraper for WegmansScraper {
    fn layout(&self) -> &SiteLayout {
        &self.layout
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_fixture() {
        let scraper = WegmansScraper::new().unwrap();
        let records = scraper
            .scrape_page(&fixtures::listing(&["Strip Steak", "Pork Loin"], false))
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_name.as_deref(), Some("Strip Steak"));
        assert_eq!(records[0].store_name, "Wegmans");
        assert_eq!(records[0].product_price.as_deref(), Some("$4.09/lb"));
        assert_eq!(
            records[0].product_link.as_deref(),
            Some("https://shop.wegmans.com/shop/product/0")
        );
        assert_eq!(
            records[1].product_image.as_deref(),
            Some("https://images.wegmans.com/1.jpg")
        );
        assert!(records.iter().all(|r| r.validate().is_ok()));
    }

    #[test]
    fn every_default_category_is_on_the_store_host() {
        let categories = WegmansScraper::default_categories();
        assert!(categories.contains_key("meat"));
        assert!(categories.values().all(|url| url.starts_with(BASE_URL)));
    }
}
