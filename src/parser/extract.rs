// Selector-driven field extraction on a single product cell.
//
// Every helper looks at the first descendant matching the selector and
// returns None when nothing matches; callers decide if that is fatal.
use crate::normalizer::normalize_price;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Accessible name (`aria-label`) of the first match.
pub fn extract_from_aria(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first_attr(el, selector, "aria-label")
}

/// Image URL of the first match. Lazy-loaded images keep the real URL in
/// `data-src` while `src` is missing or a `data:` placeholder.
pub fn extract_product_image(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let img = el.select(selector).next()?;
    let src = img.value().attr("src").filter(|s| !s.trim().is_empty() && !s.starts_with("data:"));
    src.or_else(|| img.value().attr("data-src"))
        .map(|s| s.trim().to_string())
}

pub fn extract_text_content(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
}

/// `value` attribute of the first match (`<data>`, `<input>`).
pub fn extract_from_value(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first_attr(el, selector, "value")
}

/// `href` of the first match resolved against `base_url`. Absolute hrefs are
/// returned as written.
pub fn extract_product_url(base_url: &Url, el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let href = first_attr(el, selector, "href")?;
    if href.is_empty() {
        return None;
    }
    if Url::parse(&href).is_ok() {
        return Some(href);
    }
    base_url.join(&href).ok().map(String::from)
}

/// Primary strategy: text of a node under `text_selector` matching the
/// per-unit `pattern`. Fallback: the bare numeral held in the `value` of
/// `value_selector`, given a currency prefix.
pub fn extract_price(
    el: ElementRef<'_>,
    text_selector: &Selector,
    pattern: &Regex,
    value_selector: &Selector,
) -> Option<String> {
    el.select(text_selector)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .find(|text| pattern.is_match(text))
        .or_else(|| extract_from_value(el, value_selector).map(|v| normalize_price(&v)))
}

fn first_attr(el: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    el.select(selector)
        .next()
        .and_then(|node| node.value().attr(attr))
        .map(|v| v.trim().to_string())
}
