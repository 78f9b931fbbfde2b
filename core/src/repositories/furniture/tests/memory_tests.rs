//! Unit tests for furniture listings and purchases on the in-process store

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;

use cm_shared::Pagination;

use crate::domain::entities::furniture::{
    FurnitureImage, FurnitureItem, FurnitureTransaction, ItemCategory, ItemCondition, NewFurnitureItem,
    TransactionStatus,
};
use crate::domain::entities::user::{User, UserRole};
use crate::domain::value_objects::query::FurnitureFilter;
use crate::errors::DomainError;
use crate::repositories::furniture::FurnitureRepository;
use crate::repositories::memory::InMemoryStore;
use crate::repositories::user::UserRepository;

async fn user(store: &InMemoryStore, email: &str) -> User {
    UserRepository::create(store, User::new(email, "h".to_string(), UserRole::Student, "Uni"))
        .await
        .unwrap()
}

async fn item(store: &InMemoryStore, seller: &User, title: &str, category: ItemCategory) -> FurnitureItem {
    let item = FurnitureItem::new(
        seller.id,
        NewFurnitureItem {
            title: title.to_string(),
            description: "Barely used".to_string(),
            price: dec!(30),
            condition: ItemCondition::Good,
            category,
        },
    )
    .unwrap();
    store.create_item(item).await.unwrap()
}

#[tokio::test]
async fn test_complete_marks_item_sold() {
    let store = InMemoryStore::new();
    let seller = user(&store, "seller@uni.edu").await;
    let buyer = user(&store, "buyer@uni.edu").await;
    let desk = item(&store, &seller, "Desk", ItemCategory::Furniture).await;

    let tx = store
        .purchase(FurnitureTransaction::new(&desk, buyer.id, None).unwrap())
        .await
        .unwrap();
    let done = store.complete_transaction(tx.id, Utc::now()).await.unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(store.find_item(desk.id).await.unwrap().unwrap().is_sold);

    let err = store.cancel_transaction(tx.id, Utc::now()).await.unwrap_err();
    assert!(matches!(err, DomainError::Transition(_)));
}

#[tokio::test]
async fn test_cancel_leaves_item_available() {
    let store = InMemoryStore::new();
    let seller = user(&store, "seller@uni.edu").await;
    let buyer = user(&store, "buyer@uni.edu").await;
    let desk = item(&store, &seller, "Desk", ItemCategory::Furniture).await;

    let tx = store
        .purchase(FurnitureTransaction::new(&desk, buyer.id, None).unwrap())
        .await
        .unwrap();
    store.cancel_transaction(tx.id, Utc::now()).await.unwrap();
    assert!(!store.find_item(desk.id).await.unwrap().unwrap().is_sold);

    // The slot is open again
    store
        .purchase(FurnitureTransaction::new(&desk, buyer.id, None).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_purchase_of_sold_item_rejected_under_lock() {
    let store = InMemoryStore::new();
    let seller = user(&store, "seller@uni.edu").await;
    let buyer = user(&store, "buyer@uni.edu").await;
    let desk = item(&store, &seller, "Desk", ItemCategory::Furniture).await;

    // Built from a stale, unsold snapshot
    let stale = FurnitureTransaction::new(&desk, buyer.id, None).unwrap();
    let tx = store
        .purchase(FurnitureTransaction::new(&desk, buyer.id, None).unwrap())
        .await
        .unwrap();
    store.complete_transaction(tx.id, Utc::now()).await.unwrap();

    let err = store.purchase(stale).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("item")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_buyers_one_item() {
    let store = Arc::new(InMemoryStore::new());
    let seller = user(&store, "seller@uni.edu").await;
    let first = user(&store, "first@uni.edu").await;
    let second = user(&store, "second@uni.edu").await;
    let desk = item(&store, &seller, "Desk", ItemCategory::Furniture).await;

    let a = {
        let store = store.clone();
        let tx = FurnitureTransaction::new(&desk, first.id, None).unwrap();
        tokio::spawn(async move { store.purchase(tx).await })
    };
    let b = {
        let store = store.clone();
        let tx = FurnitureTransaction::new(&desk, second.id, None).unwrap();
        tokio::spawn(async move { store.purchase(tx).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(DomainError::Conflict { .. }))));
}

#[tokio::test]
async fn test_image_limit_and_order() {
    let store = InMemoryStore::new();
    let seller = user(&store, "seller@uni.edu").await;
    let desk = item(&store, &seller, "Desk", ItemCategory::Furniture).await;

    for n in 0..2 {
        let image = store
            .add_image(FurnitureImage::new(desk.id, format!("furniture_images/{}.png", n), 99), 2)
            .await
            .unwrap();
        assert_eq!(image.display_order, n);
    }
    let err = store
        .add_image(FurnitureImage::new(desk.id, "extra.png".to_string(), 0), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("image")));
    assert_eq!(store.list_images(desk.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_browse_filters() {
    let store = InMemoryStore::new();
    let seller = user(&store, "seller@uni.edu").await;
    let buyer = user(&store, "buyer@uni.edu").await;
    item(&store, &seller, "Oak desk", ItemCategory::Furniture).await;
    item(&store, &seller, "Calculus textbook", ItemCategory::Books).await;
    let lamp = item(&store, &seller, "Desk lamp", ItemCategory::Electronics).await;

    let tx = store
        .purchase(FurnitureTransaction::new(&lamp, buyer.id, None).unwrap())
        .await
        .unwrap();
    store.complete_transaction(tx.id, Utc::now()).await.unwrap();

    let search = FurnitureFilter::from_query(None, None, None, None, Some("DESK"), None);
    let page = store.list_items(&search, Pagination::default()).await.unwrap();
    assert_eq!(page.count, 1);

    let with_sold = FurnitureFilter::from_query(None, None, None, None, Some("desk"), Some("true"));
    let page = store.list_items(&with_sold, Pagination::default()).await.unwrap();
    assert_eq!(page.count, 2);

    let books = FurnitureFilter::from_query(Some("books"), None, None, None, None, None);
    let page = store.list_items(&books, Pagination::default()).await.unwrap();
    assert_eq!(page.results[0].title, "Calculus textbook");

    let mine = store.list_transactions(buyer.id, Pagination::default()).await.unwrap();
    assert_eq!(mine.count, 1);
}
