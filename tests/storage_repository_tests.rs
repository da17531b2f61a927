//! Storage adapter behavior: idempotent snapshot upserts, insert-ignore
//! product rows, time-window queries, and department upserts.

use std::sync::Arc;

use chrono::{Duration, Utc};
use larder::models::product;
use larder::repositories::{DepartmentRepository, ProductRepository, SnapshotRepository};
use larder::source::{Department, ItemDetail};

mod test_utils;
use test_utils::setup_test_db;

fn detail(id: &str, name: &str) -> ItemDetail {
    ItemDetail {
        id: id.to_string(),
        name: Some(name.to_string()),
        unit_price: Some(2.49),
        popularity: None,
        upc: None,
        canonical_url: None,
        department_ids: None,
        extra: serde_json::Map::new(),
    }
}

#[tokio::test]
async fn snapshot_upsert_is_idempotent_and_replaces_payload() {
    let db = Arc::new(setup_test_db().await);
    let snapshots = SnapshotRepository::new(db);

    snapshots
        .upsert_item_snapshot(&detail("123", "First"))
        .await
        .unwrap();
    snapshots
        .upsert_item_snapshot(&detail("123", "Second"))
        .await
        .unwrap();

    assert_eq!(snapshots.count().await.unwrap(), 1);
    let row = snapshots.find_by_id(123).await.unwrap().expect("snapshot");
    assert_eq!(
        row.payload.get("name").and_then(|v| v.as_str()),
        Some("Second")
    );
}

#[tokio::test]
async fn snapshot_rejects_non_numeric_product_id() {
    let db = Arc::new(setup_test_db().await);
    let snapshots = SnapshotRepository::new(db);

    let result = snapshots
        .upsert_item_snapshot(&detail("not-a-number", "Broken"))
        .await;
    assert!(result.is_err());
    assert_eq!(snapshots.count().await.unwrap(), 0);
}

#[tokio::test]
async fn product_rows_are_created_once_per_id() {
    let db = Arc::new(setup_test_db().await);
    let products = ProductRepository::new(db);

    products.create_if_not_exist(&[5, 5, 7]).await.unwrap();
    products.create_if_not_exist(&[7, 9]).await.unwrap();

    assert!(products.find_by_id(5).await.unwrap().is_some());
    assert!(products.find_by_id(7).await.unwrap().is_some());
    assert!(products.find_by_id(9).await.unwrap().is_some());
    assert!(products.find_by_id(11).await.unwrap().is_none());
}

#[tokio::test]
async fn product_update_replaces_row_and_requires_existence() {
    let db = Arc::new(setup_test_db().await);
    let products = ProductRepository::new(db);

    products.create_if_not_exist(&[5]).await.unwrap();
    let updated = products
        .update(
            5,
            product::Model {
                product_id: 5,
                name: Some("Sourdough Loaf".to_string()),
                unit_price: Some(4.99),
                popularity: Some(0.8),
                upc: None,
                canonical_url: None,
                remote_last_update_at: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("Sourdough Loaf"));

    let missing = products
        .update(
            6,
            product::Model {
                product_id: 6,
                name: None,
                unit_price: None,
                popularity: None,
                upc: None,
                canonical_url: None,
                remote_last_update_at: None,
            },
        )
        .await;
    assert!(missing.is_err());

    let mismatch = products
        .update(
            5,
            product::Model {
                product_id: 6,
                name: None,
                unit_price: None,
                popularity: None,
                upc: None,
                canonical_url: None,
                remote_last_update_at: None,
            },
        )
        .await;
    assert!(mismatch.is_err());
}

#[tokio::test]
async fn find_products_since_filters_and_orders() {
    let db = Arc::new(setup_test_db().await);
    let products = ProductRepository::new(db);
    let now = Utc::now();

    products.create_if_not_exist(&[1, 2, 3, 4]).await.unwrap();
    for (id, stamp) in [
        (1, Some(now - Duration::days(3))),
        (2, Some(now - Duration::days(1))),
        (3, None),
        (4, Some(now - Duration::days(1))),
    ] {
        products
            .update(
                id,
                product::Model {
                    product_id: id,
                    name: Some(format!("Product {id}")),
                    unit_price: None,
                    popularity: None,
                    upc: None,
                    canonical_url: None,
                    remote_last_update_at: stamp.map(Into::into),
                },
            )
            .await
            .unwrap();
    }

    let recent = products
        .find_products_since(now - Duration::days(2), 10)
        .await
        .unwrap();
    let ids: Vec<i64> = recent.iter().map(|p| p.product_id).collect();
    // Same timestamp ties break toward the higher id.
    assert_eq!(ids, vec![4, 2]);

    assert!(products.find_products_since(now, 0).await.is_err());
}

#[tokio::test]
async fn find_products_name_empty_returns_unnamed_rows() {
    let db = Arc::new(setup_test_db().await);
    let products = ProductRepository::new(db);

    products.create_if_not_exist(&[3, 1, 2]).await.unwrap();
    products
        .update(
            2,
            product::Model {
                product_id: 2,
                name: Some("Named".to_string()),
                unit_price: None,
                popularity: None,
                upc: None,
                canonical_url: None,
                remote_last_update_at: None,
            },
        )
        .await
        .unwrap();

    let unnamed = products.find_products_name_empty(10).await.unwrap();
    let ids: Vec<i64> = unnamed.iter().map(|p| p.product_id).collect();
    assert_eq!(ids, vec![1, 3]);

    let limited = products.find_products_name_empty(1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].product_id, 1);

    assert!(products.find_products_name_empty(0).await.is_err());
}

#[tokio::test]
async fn department_upsert_skips_bad_ids_and_replaces_rows() {
    let db = Arc::new(setup_test_db().await);
    let departments = DepartmentRepository::new(db);

    let listing = vec![
        Department {
            id: "22888702".to_string(),
            name: Some("Bakery".to_string()),
            parent_id: None,
            count: Some(120),
            path: Some("Bakery".to_string()),
            canonical_url: Some("/bakery".to_string()),
        },
        Department {
            id: "not-numeric".to_string(),
            name: Some("Ghost".to_string()),
            parent_id: None,
            count: None,
            path: None,
            canonical_url: None,
        },
    ];
    let written = departments.upsert_departments(&listing).await.unwrap();
    assert_eq!(written, 1);
    assert_eq!(departments.count().await.unwrap(), 1);

    let renamed = vec![Department {
        id: "22888702".to_string(),
        name: Some("Bakery & Bread".to_string()),
        parent_id: None,
        count: Some(130),
        path: Some("Bakery".to_string()),
        canonical_url: Some("/bakery".to_string()),
    }];
    departments.upsert_departments(&renamed).await.unwrap();

    assert_eq!(departments.count().await.unwrap(), 1);
    let row = departments
        .find_by_id(22888702)
        .await
        .unwrap()
        .expect("department row");
    assert_eq!(row.name.as_deref(), Some("Bakery & Bread"));
    assert_eq!(row.item_count, Some(130));
}
