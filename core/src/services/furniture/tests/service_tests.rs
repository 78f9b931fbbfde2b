//! Unit tests for the furniture marketplace

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use cm_shared::Pagination;

use crate::domain::entities::furniture::{ItemCategory, ItemCondition, NewFurnitureItem, TransactionStatus};
use crate::domain::entities::user::{User, UserRole};
use crate::domain::value_objects::query::FurnitureFilter;
use crate::errors::DomainError;
use crate::repositories::InMemoryStore;
use crate::services::furniture::FurnitureService;
use crate::services::media::testing::{png, MemoryMediaStorage};
use crate::services::media::ImageUpload;
use crate::services::test_support::user;

struct Harness {
    store: Arc<InMemoryStore>,
    media: Arc<MemoryMediaStorage>,
    service: Arc<FurnitureService>,
    seller: User,
    buyer: User,
}

async fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let media = Arc::new(MemoryMediaStorage::default());
    let service = Arc::new(FurnitureService::new(store.clone(), media.clone(), 3));
    let seller = user(&store, "seller@uni.edu", UserRole::Student).await;
    let buyer = user(&store, "buyer@uni.edu", UserRole::Student).await;
    Harness {
        store,
        media,
        service,
        seller,
        buyer,
    }
}

fn desk() -> NewFurnitureItem {
    NewFurnitureItem {
        title: "Oak desk".to_string(),
        description: "Solid desk with two drawers".to_string(),
        price: dec!(45.00),
        condition: ItemCondition::Good,
        category: ItemCategory::Furniture,
    }
}

#[tokio::test]
async fn test_create_and_browse() {
    let h = harness().await;
    let item = h.service.create_item(&h.seller, desk()).await.unwrap();
    assert!(!item.is_sold);

    let mut lamp = desk();
    lamp.title = "Desk lamp".to_string();
    lamp.category = ItemCategory::Electronics;
    lamp.price = dec!(10);
    h.service.create_item(&h.buyer, lamp).await.unwrap();

    let filter = FurnitureFilter::from_query(Some("furniture"), None, None, None, None, None);
    let page = h.service.browse(&filter, Pagination::default()).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].id, item.id);

    let filter = FurnitureFilter::from_query(None, None, None, None, Some("DESK"), None);
    assert_eq!(h.service.browse(&filter, Pagination::default()).await.unwrap().count, 2);

    let mut bad = desk();
    bad.price = dec!(-5);
    let err = h.service.create_item(&h.seller, bad).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("price")));
}

#[tokio::test]
async fn test_images_seller_only_and_capped() {
    let h = harness().await;
    let item = h.service.create_item(&h.seller, desk()).await.unwrap();
    let upload = ImageUpload::new(Some("desk.png".to_string()), png(256));

    let err = h.service.add_image(&h.buyer, item.id, &upload).await.unwrap_err();
    assert!(matches!(err, DomainError::PermissionDenied { .. }));

    for expected in 0..3 {
        let image = h.service.add_image(&h.seller, item.id, &upload).await.unwrap();
        assert_eq!(image.display_order, expected);
        assert!(image.image.starts_with(&format!("furniture_images/{}/", item.id)));
    }
    let err = h.service.add_image(&h.seller, item.id, &upload).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("image")));
    assert_eq!(h.media.files.lock().unwrap().len(), 3);

    let detail = h.service.get_item(item.id).await.unwrap();
    assert_eq!(detail.images.len(), 3);
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["title"], "Oak desk");
    assert_eq!(json["images"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_purchase_rules() {
    let h = harness().await;
    let item = h.service.create_item(&h.seller, desk()).await.unwrap();

    let err = h.service.purchase(&h.seller, item.id, None).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("buyer")));

    let transaction = h.service.purchase(&h.buyer, item.id, None).await.unwrap();
    assert_eq!(transaction.sale_price, dec!(45.00));
    assert_eq!(transaction.seller_id, h.seller.id);
    assert_eq!(transaction.status, TransactionStatus::Pending);

    let other = user(&h.store, "other@uni.edu", UserRole::Provider).await;
    let err = h.service.purchase(&other, item.id, Some(dec!(50))).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }));

    let err = h.service.purchase(&h.buyer, Uuid::new_v4(), None).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_complete_marks_item_sold() {
    let h = harness().await;
    let item = h.service.create_item(&h.seller, desk()).await.unwrap();
    let transaction = h.service.purchase(&h.buyer, item.id, None).await.unwrap();

    let outsider = user(&h.store, "other@uni.edu", UserRole::Student).await;
    let err = h.service.complete(&outsider, transaction.id).await.unwrap_err();
    assert!(matches!(err, DomainError::PermissionDenied { .. }));

    let done = h.service.complete(&h.buyer, transaction.id).await.unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(h.service.get_item(item.id).await.unwrap().item.is_sold);

    let err = h.service.cancel(&h.seller, transaction.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Transition(_)));

    let err = h.service.purchase(&outsider, item.id, None).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("item")));
}

#[tokio::test]
async fn test_cancel_keeps_item_available() {
    let h = harness().await;
    let item = h.service.create_item(&h.seller, desk()).await.unwrap();
    let transaction = h.service.purchase(&h.buyer, item.id, None).await.unwrap();

    let cancelled = h.service.cancel(&h.seller, transaction.id).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);
    assert!(!h.service.get_item(item.id).await.unwrap().item.is_sold);

    // A fresh purchase can be opened again
    assert!(h.service.purchase(&h.buyer, item.id, None).await.is_ok());
    let mine = h.service.list_transactions(&h.buyer, Pagination::default()).await.unwrap();
    assert_eq!(mine.count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_single_winner() {
    let h = harness().await;
    let item = h.service.create_item(&h.seller, desk()).await.unwrap();

    let mut tasks = Vec::new();
    for n in 0..5 {
        let buyer = user(&h.store, &format!("buyer{}@uni.edu", n), UserRole::Student).await;
        let service = h.service.clone();
        tasks.push(tokio::spawn(async move { service.purchase(&buyer, item.id, None).await }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(err) => assert!(matches!(err, DomainError::Conflict { .. })),
        }
    }
    assert_eq!(winners, 1);
}
