//! Second-hand items listed between users, their photos, and the purchase
//! record that moves an item to sold.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cm_shared::validation::{validators, ValidationErrors};

use crate::domain::value_objects::money::validate_price;
use crate::errors::{DomainError, TransitionError};

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Furniture,
    Appliances,
    Electronics,
    Books,
    Clothing,
    Other,
}

/// String forms shared by serde, SQL columns and query parameters
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("\"{}\" is not a valid choice.", other)),
                }
            }
        }
    };
}

string_enum!(ItemCondition {
    New => "new",
    LikeNew => "like_new",
    Good => "good",
    Fair => "fair",
    Poor => "poor",
});

string_enum!(ItemCategory {
    Furniture => "furniture",
    Appliances => "appliances",
    Electronics => "electronics",
    Books => "books",
    Clothing => "clothing",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

string_enum!(TransactionStatus {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureItem {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub condition: ItemCondition,
    pub category: ItemCategory,
    pub is_sold: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFurnitureItem {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub condition: ItemCondition,
    pub category: ItemCategory,
}

impl FurnitureItem {
    pub fn new(seller_id: Uuid, input: NewFurnitureItem) -> Result<Self, ValidationErrors> {
        let now = Utc::now();
        let item = Self {
            id: Uuid::new_v4(),
            seller_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            price: input.price,
            condition: input.condition,
            category: input.category,
            is_sold: false,
            created_at: now,
            updated_at: now,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::required_text("title", &self.title, TITLE_MAX_LEN));
        errors.check(validators::required_text("description", &self.description, DESCRIPTION_MAX_LEN));
        errors.check(validate_price("price", self.price));
        errors.into_result()
    }

    pub fn is_available(&self) -> bool {
        !self.is_sold
    }
}

/// One photo in an item's gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureImage {
    pub id: Uuid,
    pub item_id: Uuid,
    /// Relative media path
    pub image: String,
    pub display_order: u32,
    pub uploaded_at: DateTime<Utc>,
}

impl FurnitureImage {
    pub fn new(item_id: Uuid, image: String, display_order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            image,
            display_order,
            uploaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub sale_price: Decimal,
    pub status: TransactionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FurnitureTransaction {
    /// Open a purchase of `item` by `buyer_id`.
    ///
    /// Only checks what the item itself can tell; the single-open-purchase
    /// rule is enforced by the repository under its lock.
    pub fn new(item: &FurnitureItem, buyer_id: Uuid, sale_price: Option<Decimal>) -> Result<Self, DomainError> {
        if item.is_sold {
            return Err(DomainError::invalid("item", "This item has already been sold.", "item_sold"));
        }
        if item.seller_id == buyer_id {
            return Err(DomainError::invalid("buyer", "You cannot buy your own item.", "own_item"));
        }
        let sale_price = sale_price.unwrap_or(item.price);
        validate_price("sale_price", sale_price)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            item_id: item.id,
            buyer_id,
            seller_id: item.seller_id,
            sale_price,
            status: TransactionStatus::Pending,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// `pending -> completed`; the caller marks the item sold in the same unit
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.close(TransactionStatus::Completed, now)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// `pending -> cancelled`
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.close(TransactionStatus::Cancelled, now)
    }

    fn close(&mut self, next: TransactionStatus, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != TransactionStatus::Pending {
            return Err(TransitionError::new(
                "transaction",
                self.status,
                next,
                format!("Transaction is already {}.", self.status),
            ));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item() -> FurnitureItem {
        FurnitureItem::new(
            Uuid::new_v4(),
            NewFurnitureItem {
                title: "Desk".to_string(),
                description: "Solid oak".to_string(),
                price: dec!(45.50),
                condition: ItemCondition::LikeNew,
                category: ItemCategory::Furniture,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_choice_strings() {
        assert_eq!(ItemCondition::LikeNew.as_str(), "like_new");
        assert_eq!(serde_json::to_string(&ItemCondition::LikeNew).unwrap(), "\"like_new\"");
        assert_eq!("electronics".parse::<ItemCategory>().unwrap(), ItemCategory::Electronics);
        assert!("antiques".parse::<ItemCategory>().is_err());
    }

    #[test]
    fn test_item_validation() {
        let err = FurnitureItem::new(
            Uuid::new_v4(),
            NewFurnitureItem {
                title: " ".to_string(),
                description: "".to_string(),
                price: dec!(0),
                condition: ItemCondition::Good,
                category: ItemCategory::Other,
            },
        )
        .unwrap_err();
        assert!(err.has_field("title"));
        assert!(err.has_field("description"));
        assert!(err.has_field("price"));
    }

    #[test]
    fn test_purchase_rules() {
        let mut item = item();
        let tx = FurnitureTransaction::new(&item, Uuid::new_v4(), None).unwrap();
        assert_eq!(tx.sale_price, dec!(45.50));
        assert_eq!(tx.seller_id, item.seller_id);

        let err = FurnitureTransaction::new(&item, item.seller_id, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("buyer")));

        item.is_sold = true;
        let err = FurnitureTransaction::new(&item, Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("item")));
    }

    #[test]
    fn test_terminal_transactions() {
        let now = Utc::now();
        let mut tx = FurnitureTransaction::new(&item(), Uuid::new_v4(), None).unwrap();
        tx.complete(now).unwrap();
        assert_eq!(tx.completed_at, Some(now));

        let err = tx.cancel(now).unwrap_err();
        assert_eq!(err.from, "completed");
        assert_eq!(tx.status, TransactionStatus::Completed);

        let mut tx = FurnitureTransaction::new(&item(), Uuid::new_v4(), None).unwrap();
        tx.cancel(now).unwrap();
        assert!(tx.complete(now).is_err());
        assert!(tx.completed_at.is_none());
    }
}
