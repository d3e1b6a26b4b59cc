// Listing-grid parsing shared by every retailer layout
use super::extract::{
    extract_from_aria, extract_price, extract_product_image, extract_product_url, extract_text_content,
};
use crate::model::ProductRecord;
use crate::normalizer::normalize_all;
use crate::scraper::layout::SiteLayout;
use scraper::Html;
use tracing::debug;

/// Extracts every product cell of the grid in display order.
///
/// Returns `None` when the grid container is absent from the snapshot. Cells
/// with missing fields are still returned; completeness is checked later.
pub fn parse_product_grid(html: &str, layout: &SiteLayout) -> Option<Vec<ProductRecord>> {
    let document = Html::parse_document(html);
    let container = document.select(&layout.container).next()?;

    let mut records: Vec<ProductRecord> = container
        .select(&layout.item)
        .map(|cell| {
            let product_name = extract_from_aria(cell, &layout.name_link);
            if product_name.is_none() {
                debug!(
                    "{}: cell without accessible name (link text {:?})",
                    layout.store_name,
                    extract_text_content(cell, &layout.name_link)
                );
            }
            ProductRecord {
                product_name,
                store_name: layout.store_name.clone(),
                product_price: extract_price(
                    cell,
                    &layout.price_text,
                    &layout.price_pattern,
                    &layout.price_value,
                ),
                product_link: extract_product_url(&layout.base_url, cell, &layout.name_link),
                product_image: extract_product_image(cell, &layout.image),
            }
        })
        .collect();

    normalize_all(&mut records);
    Some(records)
}
