//! Embedded relational mirror of the remote tabular source.
//!
//! One SQLite file per [`SyncContext`]; the two context instances are fully
//! independent storage units. Multi-valued columns are stored as JSON text
//! and degrade to the raw string on a malformed read instead of failing.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use qo_core::{norm, CategoryRelation, MediaRef, Product, SyncContext, WebPhoto};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MirrorResult<T> = Result<T, MirrorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushToken {
    pub token: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
}

/// Read-optimized mirror store. Writes are last-write-wins; the interior
/// mutex serializes access within one context.
pub struct MirrorStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    context: SyncContext,
}

impl MirrorStore {
    pub fn open(data_dir: &Path, context: SyncContext) -> MirrorResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(format!("mirror_{}.db", context.as_str()));
        let conn = Connection::open(&path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            context,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> SyncContext {
        self.context
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("mirror store lock poisoned")
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                brand               TEXT NOT NULL,
                product_type        TEXT NOT NULL,
                category            TEXT NOT NULL,
                subcategory         TEXT NOT NULL,
                price               INTEGER NOT NULL,
                price_with_discount INTEGER,
                quantity            INTEGER NOT NULL,
                starred             INTEGER NOT NULL,
                colors              TEXT NOT NULL,
                materials           TEXT,
                dimensions          TEXT,
                capacity            TEXT,
                media               TEXT NOT NULL,
                last_updated        TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_type ON products(product_type)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS webphotos (
                name TEXT PRIMARY KEY,
                url  TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS category_relations (
                id          TEXT PRIMARY KEY,
                category    TEXT NOT NULL,
                subcategory TEXT NOT NULL,
                is_active   INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS push_tokens (
                token      TEXT PRIMARY KEY,
                platform   TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS badge_counts (
                token TEXT PRIMARY KEY,
                count INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    // --- products ---

    pub fn all_products(&self) -> MirrorResult<Vec<Product>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, brand, product_type, category, subcategory, price,
                    price_with_discount, quantity, starred, colors, materials,
                    dimensions, capacity, media, last_updated
               FROM products ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_product)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_product(&self, id: &str) -> MirrorResult<Product> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, name, brand, product_type, category, subcategory, price,
                    price_with_discount, quantity, starred, colors, materials,
                    dimensions, capacity, media, last_updated
               FROM products WHERE id = ?1",
            params![id],
            row_to_product,
        )
        .optional()?
        .ok_or_else(|| MirrorError::NotFound(format!("product {id}")))
    }

    pub fn insert_product(&self, product: &Product) -> MirrorResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO products (id, name, brand, product_type, category, subcategory,
                                   price, price_with_discount, quantity, starred, colors,
                                   materials, dimensions, capacity, media, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params_from_iter(product_values(product)),
        )?;
        Ok(())
    }

    pub fn update_product(&self, id: &str, product: &Product) -> MirrorResult<()> {
        let mut values = product_values(product);
        values[0] = Value::Text(id.to_string());
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE products SET name = ?2, brand = ?3, product_type = ?4, category = ?5,
                                 subcategory = ?6, price = ?7, price_with_discount = ?8,
                                 quantity = ?9, starred = ?10, colors = ?11, materials = ?12,
                                 dimensions = ?13, capacity = ?14, media = ?15, last_updated = ?16
             WHERE id = ?1",
            params_from_iter(values),
        )?;
        if changed == 0 {
            return Err(MirrorError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    pub fn delete_product(&self, id: &str) -> MirrorResult<bool> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Bulk last-write-wins upsert inside one transaction.
    pub fn upsert_products(&self, products: &[Product]) -> MirrorResult<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for product in products {
            tx.execute(
                "INSERT OR REPLACE INTO products
                     (id, name, brand, product_type, category, subcategory, price,
                      price_with_discount, quantity, starred, colors, materials,
                      dimensions, capacity, media, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params_from_iter(product_values(product)),
            )?;
        }
        tx.commit()?;
        Ok(products.len())
    }

    pub fn products_by_brand(&self, brand: &str) -> MirrorResult<Vec<Product>> {
        let wanted = norm(brand);
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, brand, product_type, category, subcategory, price,
                    price_with_discount, quantity, starred, colors, materials,
                    dimensions, capacity, media, last_updated
               FROM products WHERE LOWER(TRIM(brand)) = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![wanted], row_to_product)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn products_by_type(&self, product_type: &str) -> MirrorResult<Vec<Product>> {
        let wanted = norm(product_type);
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, brand, product_type, category, subcategory, price,
                    price_with_discount, quantity, starred, colors, materials,
                    dimensions, capacity, media, last_updated
               FROM products WHERE LOWER(TRIM(product_type)) = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![wanted], row_to_product)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Category is a JSON list column, so the match runs over decoded rows.
    pub fn products_by_category(&self, category: &str) -> MirrorResult<Vec<Product>> {
        Ok(self
            .all_products()?
            .into_iter()
            .filter(|p| p.in_category(category))
            .collect())
    }

    pub fn search_products(&self, query: &str) -> MirrorResult<Vec<Product>> {
        let needle = format!("%{}%", norm(query));
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, brand, product_type, category, subcategory, price,
                    price_with_discount, quantity, starred, colors, materials,
                    dimensions, capacity, media, last_updated
               FROM products
              WHERE LOWER(name) LIKE ?1 OR LOWER(brand) LIKE ?1 OR LOWER(product_type) LIKE ?1
              ORDER BY name",
        )?;
        let rows = stmt.query_map(params![needle], row_to_product)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // --- webphotos ---

    pub fn all_webphotos(&self) -> MirrorResult<Vec<WebPhoto>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT name, url FROM webphotos ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(WebPhoto {
                name: row.get(0)?,
                url: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_webphoto(&self, name: &str) -> MirrorResult<WebPhoto> {
        let conn = self.lock();
        conn.query_row(
            "SELECT name, url FROM webphotos WHERE name = ?1",
            params![name],
            |row| {
                Ok(WebPhoto {
                    name: row.get(0)?,
                    url: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| MirrorError::NotFound(format!("webphoto {name}")))
    }

    pub fn upsert_webphoto(&self, photo: &WebPhoto) -> MirrorResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO webphotos (name, url) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET url = excluded.url",
            params![photo.name, photo.url],
        )?;
        Ok(())
    }

    pub fn delete_webphoto(&self, name: &str) -> MirrorResult<bool> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM webphotos WHERE name = ?1", params![name])?;
        Ok(changed > 0)
    }

    // --- category relations ---

    pub fn all_category_relations(&self) -> MirrorResult<Vec<CategoryRelation>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, category, subcategory, is_active, created_at, updated_at
               FROM category_relations ORDER BY category, subcategory",
        )?;
        let rows = stmt.query_map([], row_to_relation)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn upsert_category_relation(&self, relation: &CategoryRelation) -> MirrorResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO category_relations (id, category, subcategory, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET category = excluded.category,
                                           subcategory = excluded.subcategory,
                                           is_active = excluded.is_active,
                                           updated_at = excluded.updated_at",
            params![
                relation.id,
                relation.category,
                relation.subcategory,
                relation.is_active,
                relation.created_at.to_rfc3339(),
                relation.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Soft-delete toggle.
    pub fn set_relation_active(&self, id: &str, active: bool) -> MirrorResult<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE category_relations SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, active, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(MirrorError::NotFound(format!("category relation {id}")));
        }
        Ok(())
    }

    pub fn active_subcategories(&self, category: &str) -> MirrorResult<Vec<String>> {
        let wanted = norm(category);
        Ok(self
            .all_category_relations()?
            .into_iter()
            .filter(|r| r.is_active && norm(&r.category) == wanted)
            .map(|r| r.subcategory)
            .collect())
    }

    // --- push tokens / badge counts ---

    pub fn upsert_push_token(&self, token: &str, platform: &str) -> MirrorResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO push_tokens (token, platform, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(token) DO UPDATE SET platform = excluded.platform",
            params![token, platform, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn all_push_tokens(&self) -> MirrorResult<Vec<PushToken>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT token, platform, created_at FROM push_tokens ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| {
            let created: String = row.get(2)?;
            Ok(PushToken {
                token: row.get(0)?,
                platform: row.get(1)?,
                created_at: parse_timestamp(&created),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn delete_push_token(&self, token: &str) -> MirrorResult<bool> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM push_tokens WHERE token = ?1", params![token])?;
        Ok(changed > 0)
    }

    pub fn set_badge(&self, token: &str, count: i64) -> MirrorResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO badge_counts (token, count) VALUES (?1, ?2)",
            params![token, count],
        )?;
        Ok(())
    }

    pub fn get_badge(&self, token: &str) -> MirrorResult<i64> {
        let conn = self.lock();
        let count = conn
            .query_row(
                "SELECT count FROM badge_counts WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }
}

impl std::fmt::Debug for MirrorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorStore")
            .field("path", &self.path)
            .field("context", &self.context)
            .finish()
    }
}

fn product_values(product: &Product) -> Vec<Value> {
    vec![
        Value::Text(product.id.clone()),
        Value::Text(product.name.clone()),
        Value::Text(product.brand.clone()),
        Value::Text(product.product_type.clone()),
        Value::Text(encode_list(&product.category)),
        Value::Text(encode_list(&product.sub_category)),
        Value::Integer(product.price),
        product
            .price_with_discount
            .map(Value::Integer)
            .unwrap_or(Value::Null),
        Value::Integer(product.quantity),
        Value::Integer(product.starred as i64),
        Value::Text(encode_list(&product.colors)),
        product.materials.clone().map(Value::Text).unwrap_or(Value::Null),
        product.dimensions.clone().map(Value::Text).unwrap_or(Value::Null),
        product.capacity.clone().map(Value::Text).unwrap_or(Value::Null),
        Value::Text(encode_media(&product.media)),
        Value::Text(product.last_updated.to_rfc3339()),
    ]
}

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    let category: String = row.get(4)?;
    let subcategory: String = row.get(5)?;
    let colors: String = row.get(10)?;
    let media: String = row.get(14)?;
    let last_updated: String = row.get(15)?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        brand: row.get(2)?,
        product_type: row.get(3)?,
        category: parse_string_list(&category),
        sub_category: parse_string_list(&subcategory),
        price: row.get(6)?,
        price_with_discount: row.get(7)?,
        quantity: row.get(8)?,
        starred: row.get(9)?,
        colors: parse_string_list(&colors),
        materials: row.get(11)?,
        dimensions: row.get(12)?,
        capacity: row.get(13)?,
        media: parse_media_list(&media),
        last_updated: parse_timestamp(&last_updated),
    })
}

fn row_to_relation(row: &rusqlite::Row<'_>) -> rusqlite::Result<CategoryRelation> {
    let created: String = row.get(4)?;
    let updated: String = row.get(5)?;
    Ok(CategoryRelation {
        id: row.get(0)?,
        category: row.get(1)?,
        subcategory: row.get(2)?,
        is_active: row.get(3)?,
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn encode_media(items: &[MediaRef]) -> String {
    let raw: Vec<&str> = items.iter().map(MediaRef::as_str).collect();
    serde_json::to_string(&raw).unwrap_or_else(|_| "[]".to_string())
}

/// Malformed JSON degrades to the raw string as a single-element list.
fn parse_string_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|_| vec![raw.to_string()])
}

fn parse_media_list(raw: &str) -> Vec<MediaRef> {
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => items.into_iter().map(MediaRef::from_raw).collect(),
        Err(_) => vec![MediaRef::from_raw(raw)],
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn product(id: &str, name: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            brand: "Naranjos".into(),
            product_type: "Backpack".into(),
            category: vec!["Bags".into(), "Travel".into()],
            sub_category: vec!["School".into()],
            price,
            price_with_discount: None,
            quantity: 3,
            starred: false,
            colors: vec!["red".into(), "blue".into()],
            materials: Some("leather".into()),
            dimensions: None,
            capacity: None,
            media: vec![MediaRef::from_raw("https://cdn.example/a.jpg")],
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn product_crud_round_trip() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();

        store.insert_product(&product("A", "Widget", 100)).unwrap();
        let got = store.get_product("A").unwrap();
        assert_eq!(got.name, "Widget");
        assert_eq!(got.category, vec!["Bags".to_string(), "Travel".to_string()]);
        assert_eq!(got.colors.len(), 2);
        assert!(got.media[0].is_remote());

        let mut updated = got.clone();
        updated.price = 150;
        store.update_product("A", &updated).unwrap();
        assert_eq!(store.get_product("A").unwrap().price, 150);

        assert!(store.delete_product("A").unwrap());
        assert!(!store.delete_product("A").unwrap());
        assert!(matches!(
            store.get_product("A"),
            Err(MirrorError::NotFound(_))
        ));
    }

    #[test]
    fn update_of_missing_product_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();
        let err = store.update_product("ghost", &product("ghost", "x", 1)).unwrap_err();
        assert!(matches!(err, MirrorError::NotFound(_)));
    }

    #[test]
    fn contexts_are_independent_files() {
        let dir = tempdir().expect("tempdir");
        let regular = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();
        let virtual_store = MirrorStore::open(dir.path(), SyncContext::Virtual).unwrap();
        assert_ne!(regular.path(), virtual_store.path());

        regular.insert_product(&product("A", "Widget", 100)).unwrap();
        assert!(virtual_store.all_products().unwrap().is_empty());
    }

    #[test]
    fn indexed_lookups_normalize_trim_and_case() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();
        store.insert_product(&product("A", "Widget", 100)).unwrap();
        let mut other = product("B", "Gadget", 50);
        other.brand = "Otro".into();
        store.insert_product(&other).unwrap();

        assert_eq!(store.products_by_brand("  NARANJOS ").unwrap().len(), 1);
        assert_eq!(store.products_by_type("backpack").unwrap().len(), 2);
        assert_eq!(store.products_by_category("travel").unwrap().len(), 2);
        assert_eq!(store.products_by_category("shoes").unwrap().len(), 0);
        assert_eq!(store.search_products("WID").unwrap().len(), 1);
    }

    #[test]
    fn malformed_json_column_degrades_to_raw_string() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();
        store.insert_product(&product("A", "Widget", 100)).unwrap();

        let conn = Connection::open(store.path()).unwrap();
        conn.execute(
            "UPDATE products SET colors = 'rojo intenso', media = '/images/products/a.jpg' WHERE id = 'A'",
            [],
        )
        .unwrap();
        drop(conn);

        let got = store.get_product("A").unwrap();
        assert_eq!(got.colors, vec!["rojo intenso".to_string()]);
        assert_eq!(got.media, vec![MediaRef::from_raw("/images/products/a.jpg")]);
    }

    #[test]
    fn webphoto_upsert_is_last_write_wins() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();
        store
            .upsert_webphoto(&WebPhoto {
                name: "logo".into(),
                url: "https://cdn.example/logo-v1.png".into(),
            })
            .unwrap();
        store
            .upsert_webphoto(&WebPhoto {
                name: "logo".into(),
                url: "/images/webphotos/logo.png".into(),
            })
            .unwrap();

        let all = store.all_webphotos().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].url, "/images/webphotos/logo.png");
        assert!(store.delete_webphoto("logo").unwrap());
        assert!(matches!(
            store.get_webphoto("logo"),
            Err(MirrorError::NotFound(_))
        ));
    }

    #[test]
    fn relation_toggle_is_soft_delete() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Regular).unwrap();
        let now = Utc::now();
        store
            .upsert_category_relation(&CategoryRelation {
                id: "r1".into(),
                category: "Bags".into(),
                subcategory: "School".into(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        assert_eq!(store.active_subcategories("bags").unwrap(), vec!["School".to_string()]);
        store.set_relation_active("r1", false).unwrap();
        assert!(store.active_subcategories("bags").unwrap().is_empty());
        assert_eq!(store.all_category_relations().unwrap().len(), 1);
        assert!(matches!(
            store.set_relation_active("ghost", true),
            Err(MirrorError::NotFound(_))
        ));
    }

    #[test]
    fn push_tokens_and_badges() {
        let dir = tempdir().expect("tempdir");
        let store = MirrorStore::open(dir.path(), SyncContext::Virtual).unwrap();
        store.upsert_push_token("tok-1", "ios").unwrap();
        store.upsert_push_token("tok-1", "android").unwrap();
        assert_eq!(store.all_push_tokens().unwrap().len(), 1);
        assert_eq!(store.all_push_tokens().unwrap()[0].platform, "android");

        assert_eq!(store.get_badge("tok-1").unwrap(), 0);
        store.set_badge("tok-1", 4).unwrap();
        assert_eq!(store.get_badge("tok-1").unwrap(), 4);

        assert!(store.delete_push_token("tok-1").unwrap());
        assert!(!store.delete_push_token("tok-1").unwrap());
    }
}
