//! Reviews left by one party of a completed booking about the other, and
//! the rating aggregates derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use cm_shared::validation::{validators, ValidationErrors};

use crate::domain::entities::booking::{Booking, BookingStatus};
use crate::domain::entities::user::UserRole;
use crate::domain::value_objects::money::average_rating;
use crate::errors::DomainError;

pub const MIN_REVIEW_RATING: u8 = 1;
pub const MAX_REVIEW_RATING: u8 = 5;
pub const COMMENT_MAX_LEN: usize = 2000;

/// Editable part of a review; the parties and the booking never change
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

impl ReviewChanges {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Review of `booking` written by `reviewer_id`.
    ///
    /// The booking must be completed and the reviewer one of its parties;
    /// the reviewee is always the other party.
    pub fn new(booking: &Booking, reviewer_id: Uuid, rating: u8, comment: &str) -> Result<Self, DomainError> {
        if booking.status != BookingStatus::Completed {
            return Err(DomainError::invalid(
                "booking",
                "You can only review completed bookings.",
                "booking_not_completed",
            ));
        }
        let reviewee_id = booking.counterpart_of(reviewer_id).ok_or_else(|| {
            DomainError::permission_denied("You can only review bookings you participated in.")
        })?;

        let now = Utc::now();
        let review = Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            reviewer_id,
            reviewee_id,
            rating,
            comment: comment.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        review.validate()?;
        Ok(review)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !(MIN_REVIEW_RATING..=MAX_REVIEW_RATING).contains(&self.rating) {
            errors.add_error("rating", "Rating must be between 1 and 5.", "out_of_range");
        }
        errors.check(validators::required_text("comment", &self.comment, COMMENT_MAX_LEN));
        if self.reviewer_id == self.reviewee_id {
            errors.add_error("reviewee", "You cannot review yourself.", "self_review");
        }
        errors.into_result()
    }

    /// Apply an edit, re-validating the result. Nothing changes on error.
    pub fn apply_changes(&mut self, changes: ReviewChanges) -> Result<(), ValidationErrors> {
        let mut updated = self.clone();
        if let Some(rating) = changes.rating {
            updated.rating = rating;
        }
        if let Some(comment) = changes.comment {
            updated.comment = comment.trim().to_string();
        }
        updated.validate()?;
        updated.updated_at = Utc::now();
        *self = updated;
        Ok(())
    }

    /// Whether this review is about the provider side of its booking
    pub fn is_about_provider(&self, booking: &Booking) -> bool {
        self.reviewee_id == booking.provider_id
    }
}

/// Count of reviews per star value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingDistribution {
    counts: [u32; 5],
}

impl RatingDistribution {
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let mut distribution = Self::default();
        for rating in ratings {
            distribution.record(rating);
        }
        distribution
    }

    pub fn record(&mut self, rating: u8) {
        if (MIN_REVIEW_RATING..=MAX_REVIEW_RATING).contains(&rating) {
            self.counts[usize::from(rating - 1)] += 1;
        }
    }

    pub fn count(&self, stars: u8) -> u32 {
        match stars {
            1..=5 => self.counts[usize::from(stars - 1)],
            _ => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Share of reviews with `stars`, in percent to one decimal
    pub fn percentage(&self, stars: u8) -> Decimal {
        let total = self.total();
        if total == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.count(stars)) * Decimal::from(100) / Decimal::from(total)).round_dp(1)
    }
}

// Serialised as {"5_star": n, "5_star_percentage": p, ...}, best first.
impl Serialize for RatingDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        for stars in (MIN_REVIEW_RATING..=MAX_REVIEW_RATING).rev() {
            map.insert(format!("{}_star", stars), self.count(stars).into());
            map.insert(
                format!("{}_star_percentage", stars),
                serde_json::Value::String(self.percentage(stars).to_string()),
            );
        }
        map.serialize(serializer)
    }
}

/// Average, count and distribution over a set of reviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingStats {
    pub average_rating: Option<Decimal>,
    pub total_reviews: u32,
    pub rating_distribution: RatingDistribution,
}

impl RatingStats {
    pub fn from_ratings(ratings: &[u8]) -> Self {
        Self {
            average_rating: average_rating(ratings.iter().copied()),
            total_reviews: ratings.len() as u32,
            rating_distribution: RatingDistribution::from_ratings(ratings.iter().copied()),
        }
    }
}

/// Everything the rating-summary endpoint of a user reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRatingSummary {
    pub user_id: Uuid,
    pub role: UserRole,
    pub overall_average_rating: Option<Decimal>,
    pub total_reviews: u32,
    pub rating_distribution: RatingDistribution,
    pub as_provider: RatingStats,
    pub as_student: RatingStats,
    pub completed_bookings_count: u32,
    pub completed_bookings_with_reviews: u32,
    /// Percentage of completed bookings that received a review
    pub review_completion_rate: Decimal,
    pub first_review_date: Option<DateTime<Utc>>,
    pub most_recent_review_date: Option<DateTime<Utc>>,
}

/// A received review together with the role its reviewee held in the booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedReview {
    pub review: Review,
    pub reviewee_role: UserRole,
}

impl UserRatingSummary {
    pub fn build(
        user_id: Uuid,
        role: UserRole,
        received: &[ReceivedReview],
        completed_bookings: &[Uuid],
    ) -> Self {
        let ratings_for = |wanted: UserRole| -> Vec<u8> {
            received
                .iter()
                .filter(|r| r.reviewee_role == wanted)
                .map(|r| r.review.rating)
                .collect()
        };
        let all: Vec<u8> = received.iter().map(|r| r.review.rating).collect();

        let reviewed = completed_bookings
            .iter()
            .filter(|booking_id| received.iter().any(|r| r.review.booking_id == **booking_id))
            .count() as u32;
        let completed = completed_bookings.len() as u32;
        let review_completion_rate = if completed == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(reviewed) * Decimal::from(100) / Decimal::from(completed)).round_dp(1)
        };

        Self {
            user_id,
            role,
            overall_average_rating: average_rating(all.iter().copied()),
            total_reviews: all.len() as u32,
            rating_distribution: RatingDistribution::from_ratings(all.iter().copied()),
            as_provider: RatingStats::from_ratings(&ratings_for(UserRole::Provider)),
            as_student: RatingStats::from_ratings(&ratings_for(UserRole::Student)),
            completed_bookings_count: completed,
            completed_bookings_with_reviews: reviewed,
            review_completion_rate,
            first_review_date: received.iter().map(|r| r.review.created_at).min(),
            most_recent_review_date: received.iter().map(|r| r.review.created_at).max(),
        }
    }
}
