//! MySQL implementation of the BookingRepository trait.
//!
//! Every write to a service's schedule first locks that service's row, so
//! slot checks for one service are serialized; different services proceed
//! in parallel. Lock order is always service row, booking row, then the
//! parties' user rows, which are share-locked for the role checks.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use uuid::Uuid;

use cm_core::domain::entities::booking::{
    slot_conflict_error, Booking, BookingChanges, BookingStatus, CONFLICT_WINDOW_HOURS,
};
use cm_core::domain::entities::user::UserRole;
use cm_core::domain::value_objects::query::{BookingFilter, CalendarQuery, SortDirection};
use cm_core::errors::DomainError;
use cm_core::repositories::BookingRepository;
use cm_shared::{PaginatedResponse, Pagination};

use super::{col, db_err, enum_col, is_foreign_key_violation, page, uuid_col};

const BOOKING_COLUMNS: &str = "id, student_id, provider_id, service_id, booking_date, pickup_location, \
     dropoff_location, status, total_price, created_at, updated_at";

/// Statuses that hold a time slot
const ACTIVE_STATUSES: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// MySQL implementation of BookingRepository
pub struct MySqlBookingRepository {
    pool: MySqlPool,
}

impl MySqlBookingRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_booking(row: &MySqlRow) -> Result<Booking, DomainError> {
        Ok(Booking {
            id: uuid_col(row, "id")?,
            student_id: uuid_col(row, "student_id")?,
            provider_id: uuid_col(row, "provider_id")?,
            service_id: uuid_col(row, "service_id")?,
            booking_date: col(row, "booking_date")?,
            pickup_location: col(row, "pickup_location")?,
            dropoff_location: col(row, "dropoff_location")?,
            status: enum_col(row, "status")?,
            total_price: col(row, "total_price")?,
            created_at: col(row, "created_at")?,
            updated_at: col(row, "updated_at")?,
        })
    }

    async fn lock_service(conn: &mut MySqlConnection, service_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("SELECT id FROM moving_services WHERE id = ? FOR UPDATE")
            .bind(service_id.to_string())
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to lock moving service"))?
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Moving service"))
    }

    async fn lock_booking(conn: &mut MySqlConnection, id: Uuid) -> Result<Booking, DomainError> {
        let query = format!("SELECT {} FROM bookings WHERE id = ? FOR UPDATE", BOOKING_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to lock booking"))?
            .ok_or_else(|| DomainError::not_found("Booking"))?;
        Self::row_to_booking(&row)
    }

    /// Re-check the parties' roles with their user rows share-locked
    async fn check_party_roles(conn: &mut MySqlConnection, booking: &Booking) -> Result<(), DomainError> {
        let mut roles = Vec::with_capacity(2);
        for id in [booking.student_id, booking.provider_id] {
            let row = sqlx::query("SELECT role FROM users WHERE id = ? LOCK IN SHARE MODE")
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await
                .map_err(db_err("Failed to load booking party"))?
                .ok_or_else(|| DomainError::not_found("User"))?;
            roles.push(enum_col::<UserRole>(&row, "role")?);
        }
        booking.ensure_party_roles(roles[0], roles[1])
    }

    /// Whether an active booking other than `exclude` lies within the
    /// conflict window of `date`. Must run with the service row locked.
    async fn slot_taken(
        conn: &mut MySqlConnection,
        exclude: Uuid,
        service_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let window = Duration::hours(CONFLICT_WINDOW_HOURS);
        let mut query = QueryBuilder::<MySql>::new("SELECT id FROM bookings WHERE service_id = ");
        query
            .push_bind(service_id.to_string())
            .push(" AND id <> ")
            .push_bind(exclude.to_string())
            .push(" AND booking_date > ")
            .push_bind(date - window)
            .push(" AND booking_date < ")
            .push_bind(date + window);
        push_status_in(&mut query, &ACTIVE_STATUSES);
        query.push(" LIMIT 1 FOR UPDATE");

        let row = query
            .build()
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to check booking slot"))?;
        Ok(row.is_some())
    }
}

fn push_status_in(query: &mut QueryBuilder<'_, MySql>, statuses: &[BookingStatus]) {
    query.push(" AND status IN (");
    let mut list = query.separated(", ");
    for status in statuses {
        list.push_bind(status.as_str());
    }
    list.push_unseparated(")");
}

#[async_trait]
impl BookingRepository for MySqlBookingRepository {
    async fn create(&self, booking: Booking) -> Result<Booking, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        Self::lock_service(&mut tx, booking.service_id).await?;

        if Self::slot_taken(&mut tx, booking.id, booking.service_id, booking.booking_date).await? {
            return Err(slot_conflict_error());
        }

        let query = format!(
            "INSERT INTO bookings ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            BOOKING_COLUMNS
        );
        sqlx::query(&query)
            .bind(booking.id.to_string())
            .bind(booking.student_id.to_string())
            .bind(booking.provider_id.to_string())
            .bind(booking.service_id.to_string())
            .bind(booking.booking_date)
            .bind(&booking.pickup_location)
            .bind(&booking.dropoff_location)
            .bind(booking.status.as_str())
            .bind(booking.total_price)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DomainError::not_found("User")
                } else {
                    db_err("Failed to create booking")(e)
                }
            })?;

        tx.commit().await.map_err(db_err("Failed to commit booking"))?;
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, DomainError> {
        let query = format!("SELECT {} FROM bookings WHERE id = ?", BOOKING_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find booking"))?;

        row.as_ref().map(Self::row_to_booking).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        now: DateTime<Utc>,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Booking>, DomainError> {
        let push_where = |query: &mut QueryBuilder<'_, MySql>| {
            query
                .push(" FROM bookings WHERE (student_id = ")
                .push_bind(user_id.to_string())
                .push(" OR provider_id = ")
                .push_bind(user_id.to_string())
                .push(")");
            if let Some(status) = filter.status {
                query.push(" AND status = ").push_bind(status.as_str());
            }
            if let Some(start) = filter.start_date {
                query.push(" AND booking_date >= ").push_bind(day_start(start));
            }
            if let Some(end) = filter.end_date {
                query
                    .push(" AND booking_date < ")
                    .push_bind(day_start(end + Duration::days(1)));
            }
            match filter.upcoming {
                Some(true) => {
                    query.push(" AND booking_date >= ").push_bind(now);
                    push_status_in(query, &ACTIVE_STATUSES);
                }
                Some(false) => {
                    query.push(" AND booking_date < ").push_bind(now);
                }
                None => {}
            }
        };

        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*)");
        push_where(&mut count);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count bookings"))?;

        let direction = match filter.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let mut select = QueryBuilder::<MySql>::new("SELECT ");
        select.push(BOOKING_COLUMNS);
        push_where(&mut select);
        select
            .push(format!(" ORDER BY booking_date {0}, id {0}", direction))
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list bookings"))?;

        let bookings = rows.iter().map(Self::row_to_booking).collect::<Result<Vec<_>, _>>()?;
        Ok(page(bookings, pagination, total))
    }

    async fn transition(
        &self,
        id: Uuid,
        next: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(Booking, bool), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        let mut booking = Self::lock_booking(&mut tx, id).await?;
        Self::check_party_roles(&mut tx, &booking).await?;

        let changed = booking.transition_to(next, now)?;
        if changed {
            sqlx::query("UPDATE bookings SET status = ?, updated_at = ? WHERE id = ?")
                .bind(booking.status.as_str())
                .bind(booking.updated_at)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to update booking status"))?;
        }

        tx.commit().await.map_err(db_err("Failed to commit booking status"))?;
        Ok((booking, changed))
    }

    async fn update_details(
        &self,
        id: Uuid,
        changes: BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking, DomainError> {
        let service_id = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking"))?
            .service_id;

        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        Self::lock_service(&mut tx, service_id).await?;
        let mut booking = Self::lock_booking(&mut tx, id).await?;
        Self::check_party_roles(&mut tx, &booking).await?;

        let moves = changes.booking_date.map_or(false, |d| d != booking.booking_date);
        booking.apply_changes(changes, now)?;
        if moves && Self::slot_taken(&mut tx, id, service_id, booking.booking_date).await? {
            return Err(slot_conflict_error());
        }

        sqlx::query(
            r#"
            UPDATE bookings
            SET booking_date = ?, pickup_location = ?, dropoff_location = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(booking.booking_date)
        .bind(&booking.pickup_location)
        .bind(&booking.dropoff_location)
        .bind(booking.updated_at)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update booking"))?;

        tx.commit().await.map_err(db_err("Failed to commit booking update"))?;
        Ok(booking)
    }

    async fn calendar(&self, query: &CalendarQuery) -> Result<Vec<Booking>, DomainError> {
        let mut select = QueryBuilder::<MySql>::new("SELECT ");
        select
            .push(BOOKING_COLUMNS)
            .push(" FROM bookings WHERE booking_date >= ")
            .push_bind(day_start(query.start_date))
            .push(" AND booking_date < ")
            .push_bind(day_start(query.end_date + Duration::days(1)));
        push_status_in(&mut select, &query.statuses);
        if let Some(provider_id) = query.provider_id {
            select.push(" AND provider_id = ").push_bind(provider_id.to_string());
        }
        if let Some(service_id) = query.service_id {
            select.push(" AND service_id = ").push_bind(service_id.to_string());
        }
        select.push(" ORDER BY booking_date ASC, id ASC");

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to load booking calendar"))?;
        rows.iter().map(Self::row_to_booking).collect()
    }

    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        let rows = sqlx::query(
            "SELECT id FROM bookings WHERE (student_id = ? OR provider_id = ?) AND status = ?",
        )
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .bind(BookingStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list completed bookings"))?;

        rows.iter().map(|row| uuid_col(row, "id")).collect()
    }
}
