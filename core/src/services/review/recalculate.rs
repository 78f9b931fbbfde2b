//! Offline rebuild of the rating aggregates from the review rows.
//!
//! The review flow keeps aggregates current; this job repairs them after
//! manual data fixes or imports.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::entities::user::UserRole;
use crate::domain::value_objects::money::average_rating;
use crate::errors::DomainError;

use super::service::ReviewService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecalculationOptions {
    /// Report what would change without writing
    pub dry_run: bool,
    pub services: bool,
    pub users: bool,
    pub batch_size: u64,
}

impl Default for RecalculationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            services: true,
            users: true,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    pub dry_run: bool,
    pub services_checked: u64,
    pub services_updated: u64,
    pub users_checked: u64,
    pub users_updated: u64,
}

impl ReviewService {
    pub async fn recalculate_ratings(&self, options: RecalculationOptions) -> Result<RecalculationReport, DomainError> {
        let batch_size = options.batch_size.max(1);
        let mut report = RecalculationReport {
            dry_run: options.dry_run,
            ..Default::default()
        };

        if options.services {
            let mut offset = 0;
            loop {
                let batch = self.services.list_batch(offset, batch_size).await?;
                if batch.is_empty() {
                    break;
                }
                for service in &batch {
                    let ratings = self.reviews.service_ratings(service.id).await?;
                    let total = ratings.len() as u32;
                    let average = average_rating(ratings).unwrap_or(Decimal::ZERO);
                    report.services_checked += 1;
                    if service.rating_average == average && service.total_reviews == total {
                        continue;
                    }
                    debug!(
                        service_id = %service.id,
                        old_average = %service.rating_average,
                        new_average = %average,
                        "Service rating drifted"
                    );
                    if !options.dry_run {
                        self.services.update_rating(service.id, average, total).await?;
                    }
                    report.services_updated += 1;
                }
                offset += batch.len() as u64;
            }
        }

        if options.users {
            let mut offset = 0;
            loop {
                let batch = self.users.list_batch(offset, batch_size).await?;
                if batch.is_empty() {
                    break;
                }
                for user in &batch {
                    let as_provider = average_rating(self.reviews.user_ratings(user.id, UserRole::Provider).await?)
                        .unwrap_or(Decimal::ZERO);
                    let as_student = average_rating(self.reviews.user_ratings(user.id, UserRole::Student).await?)
                        .unwrap_or(Decimal::ZERO);
                    report.users_checked += 1;
                    if user.avg_rating_as_provider == as_provider && user.avg_rating_as_student == as_student {
                        continue;
                    }
                    if !options.dry_run {
                        self.users.update_ratings(user.id, as_provider, as_student).await?;
                    }
                    report.users_updated += 1;
                }
                offset += batch.len() as u64;
            }
        }

        info!(
            dry_run = report.dry_run,
            services_checked = report.services_checked,
            services_updated = report.services_updated,
            users_checked = report.users_checked,
            users_updated = report.users_updated,
            "Rating recalculation finished"
        );
        Ok(report)
    }
}
