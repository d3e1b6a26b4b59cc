use crate::model::ScraperError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Raw selectors for one retailer's listing grid.
pub struct LayoutSpec {
    pub store_name: &'static str,
    pub base_url: &'static str,
    /// Grid container; also the "page loaded" condition.
    pub container: &'static str,
    /// Product cell, relative to the container.
    pub item: &'static str,
    /// Link carrying both the `aria-label` name and the `href`.
    pub name_link: &'static str,
    pub image: &'static str,
    pub price_text: &'static str,
    pub price_pattern: &'static str,
    pub price_value: &'static str,
    /// Scoped path to the "load more" control, so a "load previous" button
    /// sharing its class never matches.
    pub load_more: &'static str,
}

/// Parsed, ready-to-use layout.
#[derive(Debug)]
pub struct SiteLayout {
    pub store_name: String,
    pub base_url: Url,
    pub container_css: String,
    pub load_more_css: String,
    pub container: Selector,
    pub item: Selector,
    pub name_link: Selector,
    pub image: Selector,
    pub price_text: Selector,
    pub price_pattern: Regex,
    pub price_value: Selector,
}

impl SiteLayout {
    pub fn new(raw: LayoutSpec) -> Result<Self, ScraperError> {
        let base_url = Url::parse(raw.base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            url: raw.base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            store_name: raw.store_name.to_string(),
            base_url,
            container_css: raw.container.to_string(),
            load_more_css: raw.load_more.to_string(),
            container: parse_selector(raw.container)?,
            item: parse_selector(raw.item)?,
            name_link: parse_selector(raw.name_link)?,
            image: parse_selector(raw.image)?,
            price_text: parse_selector(raw.price_text)?,
            price_pattern: Regex::new(raw.price_pattern)?,
            price_value: parse_selector(raw.price_value)?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}
