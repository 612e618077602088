//! Sample inventory for a fresh database

use stockroom::{ItemStore, NewItem, StoreError};
use uuid::Uuid;

const SAMPLE_ITEMS: &[(&str, i64, f64)] = &[
    ("Laptop", 10, 999.99),
    ("Smartphone", 20, 699.99),
    ("Headphones", 15, 199.99),
    ("Keyboard", 25, 89.99),
    ("Mouse", 30, 49.99),
    ("Monitor", 12, 299.99),
    ("Webcam", 18, 79.99),
    ("Printer", 7, 149.99),
    ("Tablet", 5, 399.99),
    ("Smartwatch", 14, 249.99),
    ("External Hard Drive", 8, 119.99),
    ("USB Flash Drive", 50, 19.99),
    ("Router", 6, 89.99),
    ("Projector", 3, 499.99),
    ("Bluetooth Speaker", 22, 129.99),
    ("Gaming Console", 11, 499.99),
    ("Camera", 4, 599.99),
    ("Fitness Tracker", 16, 99.99),
    ("Drone", 2, 899.99),
    ("VR Headset", 9, 399.99),
];

/// Insert the sample items if the store is empty
///
/// Returns how many items were inserted; a store that already holds data
/// is left alone.
pub async fn seed_if_empty(store: &dyn ItemStore) -> Result<usize, StoreError> {
    if store.count().await? > 0 {
        tracing::debug!("Store already populated, skipping seed");
        return Ok(0);
    }

    for &(name, stock, price) in SAMPLE_ITEMS {
        let item = NewItem {
            name: name.to_string(),
            stock,
            price,
        }
        .into_item(Uuid::new_v4().to_string());
        store.create(item).await?;
    }

    tracing::info!("Seeded store with {} sample items", SAMPLE_ITEMS.len());
    Ok(SAMPLE_ITEMS.len())
}
