use crate::model::{CatalogEntry, CatalogProduct, StorageError};
use crate::reconciler::{Catalog, CatalogChanges};
use crate::utils::parse_datetime;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the catalog database and creates the schema if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::init(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                store_name TEXT NOT NULL,
                product_name TEXT NOT NULL,
                product_price TEXT NOT NULL,
                product_link TEXT NOT NULL,
                product_image TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                UNIQUE (store_name, product_name)
            );
            "
        )?;
        Ok(Self { conn })
    }

    /// Returns every catalog entry ordered by store, then name.
    pub fn get_all_products(&self) -> Result<Vec<CatalogEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, store_name, product_name, product_price, product_link, product_image, last_seen
             FROM products ORDER BY store_name, product_name",
        )?;

        let rows = stmt.query_map([], |row| Ok(Self::map_entry(row)))?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row??);
        }
        Ok(products)
    }

    pub fn product_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn map_entry(row: &Row) -> Result<CatalogEntry, StorageError> {
        let last_seen_str: String = row.get(6)?;
        let last_seen =
            parse_datetime(&last_seen_str).ok_or(StorageError::InvalidTimestamp(last_seen_str))?;

        Ok(CatalogEntry {
            id: row.get(0)?,
            product: CatalogProduct {
                store_name: row.get(1)?,
                product_name: row.get(2)?,
                product_price: row.get(3)?,
                product_link: row.get(4)?,
                product_image: row.get(5)?,
            },
            last_seen,
        })
    }
}

impl Catalog for SqliteStorage {
    fn find_product(&self, store_name: &str, product_name: &str) -> Result<Option<CatalogEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, store_name, product_name, product_price, product_link, product_image, last_seen
             FROM products WHERE store_name = ?1 AND product_name = ?2",
        )?;

        stmt.query_row(params![store_name, product_name], |row| Ok(Self::map_entry(row)))
            .optional()?
            .transpose()
    }

    /// Writes inserts and updates in a single transaction, so readers see
    /// either the previous catalog or the whole batch.
    fn apply_changes(&mut self, changes: &CatalogChanges, seen_at: DateTime<Utc>) -> Result<(), StorageError> {
        let seen_at = seen_at.to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO products (store_name, product_name, product_price, product_link, product_image, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for product in &changes.inserts {
                insert.execute(params![
                    &product.store_name,
                    &product.product_name,
                    &product.product_price,
                    &product.product_link,
                    &product.product_image,
                    &seen_at,
                ])?;
            }

            let mut update = tx.prepare(
                "UPDATE products
                 SET product_price = ?2, product_link = ?3, product_image = ?4, last_seen = ?5
                 WHERE id = ?1",
            )?;
            for (id, product) in &changes.updates {
                update.execute(params![
                    id,
                    &product.product_price,
                    &product.product_link,
                    &product.product_image,
                    &seen_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{record, ScrapeBatch};
    use crate::reconciler::process_scrape_results;

    fn product(name: &str, price: &str) -> CatalogProduct {
        record(name, price).validate().unwrap()
    }

    #[test]
    fn inserted_products_round_trip() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let changes = CatalogChanges {
            inserts: vec![product("Kale", "$1.99"), product("Bananas", "$0.69/lb")],
            updates: vec![],
        };
        storage.apply_changes(&changes, Utc::now()).unwrap();

        let all = storage.get_all_products().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].product.product_name, "Bananas");

        let kale = storage.find_product("Wegmans", "Kale").unwrap().unwrap();
        assert_eq!(kale.product, product("Kale", "$1.99"));
        assert!(storage.find_product("Safeway", "Kale").unwrap().is_none());
    }

    #[test]
    fn update_changes_listing_and_last_seen_only() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let first_seen = Utc::now() - chrono::Duration::days(1);
        storage
            .apply_changes(&CatalogChanges { inserts: vec![product("Ham", "$4.99/lb")], updates: vec![] }, first_seen)
            .unwrap();
        let id = storage.find_product("Wegmans", "Ham").unwrap().unwrap().id;

        storage
            .apply_changes(
                &CatalogChanges { inserts: vec![], updates: vec![(id, product("Ham", "$3.99/lb"))] },
                Utc::now(),
            )
            .unwrap();

        let ham = storage.find_product("Wegmans", "Ham").unwrap().unwrap();
        assert_eq!(ham.id, id);
        assert_eq!(ham.product.product_price, "$3.99/lb");
        assert!(ham.last_seen > first_seen);
    }

    #[test]
    fn failed_batch_leaves_catalog_untouched() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        // second insert violates UNIQUE(store_name, product_name)
        let changes = CatalogChanges {
            inserts: vec![product("Kale", "$1.99"), product("Kale", "$2.49")],
            updates: vec![],
        };
        assert!(storage.apply_changes(&changes, Utc::now()).is_err());
        assert_eq!(storage.product_count().unwrap(), 0);
    }

    #[test]
    fn reconciling_twice_is_idempotent_against_sqlite() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let mut batch = ScrapeBatch::new();
        batch.insert("produce".into(), Some(vec![record("Kale", "$1.99"), record("Figs", "$3.99")]));
        batch.insert("meat".into(), None);

        process_scrape_results(&batch, &mut storage).unwrap();
        let before = storage.get_all_products().unwrap();

        let report = process_scrape_results(&batch, &mut storage).unwrap();
        assert_eq!(report.unchanged, 2);
        assert_eq!(storage.get_all_products().unwrap(), before);
    }
}
