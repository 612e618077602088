//! SQLite-backed item store
//!
//! One connection behind a mutex; every statement runs on the blocking pool.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::Arc;
use stockroom::{Item, ItemPage, ItemQuery, ItemStore, StoreError};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL,
    stock INTEGER NOT NULL CHECK (stock >= 0),
    price REAL NOT NULL CHECK (price > 0)
);
CREATE INDEX IF NOT EXISTS idx_items_name ON items (name);
";

/// [`ItemStore`] persisted in a SQLite database
#[derive(Clone)]
pub struct SqliteItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteItemStore {
    /// Open (or create) the database at `path`; `:memory:` gives a private
    /// in-memory database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(StoreError::backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
            .map_err(StoreError::backend)
    }
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        stock: row.get(2)?,
        price: row.get(3)?,
    })
}

/// WHERE clause and bound values for the filters of `query`
fn filter_clause(query: &ItemQuery) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(min) = query.min_stock {
        conditions.push("stock >= ?");
        values.push(Value::Integer(min));
    }
    if let Some(name) = &query.name {
        conditions.push("LOWER(name) LIKE ? ESCAPE '\\'");
        values.push(Value::Text(format!("%{}%", escape_like(&name.to_ascii_lowercase()))));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn find(&self, id: &str) -> Result<Option<Item>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, stock, price FROM items WHERE id = ?1",
                params![id],
                row_to_item,
            )
            .optional()
        })
        .await
    }

    async fn create(&self, item: Item) -> Result<Item, StoreError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO items (id, name, stock, price) VALUES (?1, ?2, ?3, ?4)",
                params![item.id, item.name, item.stock, item.price],
            )?;
            Ok(item)
        })
        .await
    }

    async fn save(&self, item: Item) -> Result<Item, StoreError> {
        let (affected, item) = self
            .run(move |conn| {
                let affected = conn.execute(
                    "UPDATE items SET name = ?2, stock = ?3, price = ?4 WHERE id = ?1",
                    params![item.id, item.name, item.stock, item.price],
                )?;
                Ok((affected, item))
            })
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(item)
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        let id = id.to_string();
        let affected = self
            .run(move |conn| conn.execute("DELETE FROM items WHERE id = ?1", params![id]))
            .await?;
        Ok(affected as u64)
    }

    async fn list(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        let (where_clause, values) = filter_clause(query);
        // Column and direction come from closed enums, never from raw input
        let select = format!(
            "SELECT id, name, stock, price FROM items{where_clause} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            query.sort_by.column(),
            query.sort_order.keyword(),
        );
        let count = format!("SELECT COUNT(*) FROM items{where_clause}");
        let limit = query.page_size as i64;
        let offset = query.offset() as i64;

        debug!("Listing items: {}", select);

        let (total, data) = self
            .run(move |conn| {
                let total: i64 =
                    conn.query_row(&count, params_from_iter(values.iter()), |row| row.get(0))?;

                let mut page_values = values;
                page_values.push(Value::Integer(limit));
                page_values.push(Value::Integer(offset));

                let mut stmt = conn.prepare(&select)?;
                let data = stmt
                    .query_map(params_from_iter(page_values.iter()), row_to_item)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok((total, data))
            })
            .await?;

        Ok(ItemPage::new(data, total as u64, query))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let total: i64 = self
            .run(|conn| conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0)))
            .await?;
        Ok(total as u64)
    }
}

impl std::fmt::Debug for SqliteItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteItemStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str, stock: i64, price: f64) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
            stock,
            price,
        }
    }

    async fn store_with(items: &[Item]) -> SqliteItemStore {
        let store = SqliteItemStore::open_in_memory().unwrap();
        for item in items {
            store.create(item.clone()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_crud() {
        let store = store_with(&[]).await;
        assert_eq!(store.find("a").await.unwrap(), None);

        let laptop = item("a", "Laptop", 10, 999.99);
        store.create(laptop.clone()).await.unwrap();
        assert_eq!(store.find("a").await.unwrap(), Some(laptop));

        let cheaper = item("a", "Laptop", 8, 899.99);
        store.save(cheaper.clone()).await.unwrap();
        assert_eq!(store.find("a").await.unwrap(), Some(cheaper));

        assert_eq!(store.delete("a").await.unwrap(), 1);
        assert_eq!(store.delete("a").await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_missing_is_not_found() {
        let store = store_with(&[]).await;
        let err = store.save(item("ghost", "Ghost", 1, 1.0)).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_backend_error() {
        let store = store_with(&[item("a", "Laptop", 10, 999.99)]).await;
        let err = store.create(item("a", "Tablet", 5, 399.99)).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_pages() {
        let store = store_with(&[
            item("1", "Gaming Laptop", 5, 1500.0),
            item("2", "Office Laptop", 25, 800.0),
            item("3", "Gaming Mouse", 40, 50.0),
            item("4", "Laptop Stand", 30, 35.0),
        ])
        .await;

        let query = ItemQuery::new(None, None, Some("price"), Some("desc"), Some(20), None);
        let page = store.list(&query).await.unwrap();
        let names: Vec<_> = page.data.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Office Laptop", "Gaming Mouse", "Laptop Stand"]);
        assert_eq!(page.total, 3);

        let query = ItemQuery::new(None, None, None, None, None, Some("LAPTOP".into()));
        let page = store.list(&query).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.data[0].name, "Gaming Laptop");

        let query = ItemQuery::new(Some(2), Some(3), Some("stock"), None, None, None);
        let page = store.list(&query).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Gaming Mouse");
        assert!(page.has_prev);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn test_name_filter_is_literal() {
        let store = store_with(&[
            item("1", "100% Cotton Shirt", 3, 20.0),
            item("2", "1000 Piece Puzzle", 3, 20.0),
        ])
        .await;

        let query = ItemQuery::new(None, None, None, None, None, Some("100%".into()));
        let page = store.list(&query).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, "1");
    }

    #[tokio::test]
    async fn test_name_filter_agrees_with_memory_store() {
        let items = [
            item("1", "Émile Chair", 2, 120.0),
            item("2", "émile Stool", 4, 45.0),
            item("3", "EMILE Desk", 1, 300.0),
        ];
        let sqlite = store_with(&items).await;
        let memory = stockroom::MemoryItemStore::new();
        for item in &items {
            memory.create(item.clone()).await.unwrap();
        }

        for (needle, expected) in [("é", 1), ("É", 1), ("emile", 1), ("MILE", 3)] {
            let query = ItemQuery::new(None, None, None, None, None, Some(needle.into()));
            let from_sqlite = sqlite.list(&query).await.unwrap();
            let from_memory = memory.list(&query).await.unwrap();
            assert_eq!(from_sqlite.total, expected, "sqlite, needle {needle:?}");
            assert_eq!(from_sqlite, from_memory, "needle {needle:?}");
        }
    }

    #[tokio::test]
    async fn test_reopen_file_database() {
        let path = std::env::temp_dir().join(format!(
            "stockroom-test-{}-{}.db",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let store = SqliteItemStore::open(&path).unwrap();
            store.create(item("a", "Drone", 2, 899.99)).await.unwrap();
        }

        let store = SqliteItemStore::open(&path).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.find("a").await.unwrap().unwrap().name, "Drone");

        drop(store);
        let _ = std::fs::remove_file(&path);
    }
}
