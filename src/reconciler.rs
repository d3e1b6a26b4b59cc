// Merges a ScrapeBatch into the catalog, keyed by (store, product name).
use crate::model::{CatalogEntry, CatalogProduct, ScrapeBatch, StorageError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// The catalog collaborator the reconciler writes through.
pub trait Catalog {
    fn find_product(&self, store_name: &str, product_name: &str) -> Result<Option<CatalogEntry>, StorageError>;

    /// Applies every change as one unit; `seen_at` stamps written rows.
    fn apply_changes(&mut self, changes: &CatalogChanges, seen_at: DateTime<Utc>) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatalogChanges {
    pub inserts: Vec<CatalogProduct>,
    /// (entry id, new listing)
    pub updates: Vec<(i64, CatalogProduct)>,
}

impl CatalogChanges {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: usize,
    pub skipped_categories: usize,
}

/// Validates and diffs `batch` against `catalog` without writing anything.
pub fn plan_changes<C: Catalog + ?Sized>(
    batch: &ScrapeBatch,
    catalog: &C,
) -> Result<(CatalogChanges, ReconcileReport), StorageError> {
    let mut report = ReconcileReport::default();
    let mut candidates: Vec<CatalogProduct> = Vec::new();
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for (category, products) in batch {
        let Some(products) = products else {
            debug!("Skipping category {}: no scrape result", category);
            report.skipped_categories += 1;
            continue;
        };

        for record in products {
            let product = match record.validate() {
                Ok(product) => product,
                Err(e) => {
                    warn!(
                        category = category.as_str(),
                        store = record.store_name.as_str(),
                        name = record.product_name.as_deref().unwrap_or("<unnamed>"),
                        "Rejected product: {}",
                        e
                    );
                    report.rejected += 1;
                    continue;
                }
            };

            let key = (product.store_name.clone(), product.product_name.clone());
            match positions.get(&key) {
                Some(&at) => candidates[at] = product,
                None => {
                    positions.insert(key, candidates.len());
                    candidates.push(product);
                }
            }
        }
    }

    let mut changes = CatalogChanges::default();
    for product in candidates {
        match catalog.find_product(&product.store_name, &product.product_name)? {
            Some(existing) if existing.product.same_listing(&product) => report.unchanged += 1,
            Some(existing) => {
                report.updated += 1;
                changes.updates.push((existing.id, product));
            }
            None => {
                report.inserted += 1;
                changes.inserts.push(product);
            }
        }
    }

    Ok((changes, report))
}

/// Reconciles one batch into the catalog. Unchanged batches cause no writes.
pub fn process_scrape_results<C: Catalog + ?Sized>(
    batch: &ScrapeBatch,
    catalog: &mut C,
) -> Result<ReconcileReport, StorageError> {
    let (changes, report) = plan_changes(batch, &*catalog)?;
    if !changes.is_empty() {
        catalog.apply_changes(&changes, Utc::now())?;
    }
    info!(
        "Reconciled: {} inserted, {} updated, {} unchanged, {} rejected, {} categories skipped",
        report.inserted, report.updated, report.unchanged, report.rejected, report.skipped_categories
    );
    Ok(report)
}
