//! Item model, write payloads and list queries

use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const MAX_NAME_LEN: usize = 100;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// A stocked item as held by the durable store
///
/// The core never edits these fields; it only moves whole snapshots between
/// the store, the cache and callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub stock: i64,
    pub price: f64,
}

/// Payload for creating an item; the id is assigned on create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub stock: i64,
    pub price: f64,
}

/// Full replacement payload for an existing item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: String,
    pub stock: i64,
    pub price: f64,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.stock, self.price)
    }

    pub fn into_item(self, id: String) -> Item {
        Item {
            id,
            name: self.name,
            stock: self.stock,
            price: self.price,
        }
    }
}

impl ItemUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.stock, self.price)
    }

    pub fn into_item(self, id: String) -> Item {
        Item {
            id,
            name: self.name,
            stock: self.stock,
            price: self.price,
        }
    }
}

fn validate_fields(name: &str, stock: i64, price: f64) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(ValidationError(format!(
            "Name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    if stock < 0 {
        return Err(ValidationError("Stock cannot be negative".to_string()));
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError("Price must be greater than 0".to_string()));
    }
    Ok(())
}

/// Column a listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Stock,
    Price,
}

impl SortField {
    /// Parse a user-supplied field, falling back to `name`
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "stock" => SortField::Stock,
            "price" => SortField::Price,
            _ => SortField::Name,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Stock => "stock",
            SortField::Price => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a user-supplied order, falling back to `asc`
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "desc" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A normalized page request over the item collection
///
/// Out-of-range input is clamped rather than rejected: page numbers below 1
/// become 1 and page sizes outside `1..=100` become 10.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// Only items with `stock >= min_stock`
    pub min_stock: Option<i64>,
    /// Case-insensitive substring match on the name
    pub name: Option<String>,
}

impl Default for ItemQuery {
    fn default() -> Self {
        ItemQuery {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::Name,
            sort_order: SortOrder::Asc,
            min_stock: None,
            name: None,
        }
    }
}

impl ItemQuery {
    pub fn new(
        page: Option<i64>,
        page_size: Option<i64>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        min_stock: Option<i64>,
        name: Option<String>,
    ) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p.min(u32::MAX as i64) as u32,
            _ => 1,
        };
        let page_size = match page_size {
            Some(s) if (1..=MAX_PAGE_SIZE as i64).contains(&s) => s as u32,
            _ => DEFAULT_PAGE_SIZE,
        };

        ItemQuery {
            page,
            page_size,
            sort_by: sort_by.map(SortField::parse_or_default).unwrap_or_default(),
            sort_order: sort_order
                .map(SortOrder::parse_or_default)
                .unwrap_or_default(),
            min_stock,
            name: name.filter(|n| !n.is_empty()),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    /// Whether `item` passes the filters of this query
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(min) = self.min_stock {
            if item.stock < min {
                return false;
            }
        }
        // ASCII-only case folding, the same as SQLite's LOWER()
        if let Some(needle) = &self.name {
            if !item
                .name
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase())
            {
                return false;
            }
        }
        true
    }

    /// Order two items by the requested column and direction
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let ord = match self.sort_by {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Stock => a.stock.cmp(&b.stock),
            SortField::Price => a.price.total_cmp(&b.price),
        };
        match self.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPage {
    pub data: Vec<Item>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl ItemPage {
    pub fn new(data: Vec<Item>, total: u64, query: &ItemQuery) -> Self {
        let total_pages = total.div_ceil(query.page_size as u64);
        ItemPage {
            data,
            total,
            page: query.page,
            page_size: query.page_size,
            total_pages,
            has_next: (query.page as u64) < total_pages,
            has_prev: query.page > 1,
        }
    }
}
