//! PostgreSQL-backed `LandAllocationRepository` using Diesel ORM.
//!
//! `allocate` runs one transaction that:
//!
//! 1. bounds lock waits and statements with `SET LOCAL` timeouts;
//! 2. locks the parcel row with `SELECT ... FOR UPDATE`;
//! 3. claims the next unit through [`LandParcel::claim_unit`];
//! 4. writes the new availability, the unit, the allocation and the
//!    notification outbox row.
//!
//! Concurrent allocations against the same parcel queue behind the row
//! lock, so each one observes the availability the previous one committed.
//! The unique index on `land_allocations.member_id` backs up the service's
//! duplicate check when the same member races itself.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::land::{
    AllocatedLand, AllocationDraft, AllocationRecord, AllocationStatus, DIRECT_ALLOCATION_NOTE,
    LandParcel, LandUnitStatus, MemberId, NotificationState, ParcelId,
};
use crate::domain::ports::{LandAllocationRepository, LandAllocationRepositoryError, OutboxStatus};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, map_pool_error};
use super::models::{
    LandAllocationRow, LandParcelRow, LandParcelUnitRow, NewLandAllocationRow,
    NewLandParcelUnitRow, NewNotificationRow, count_to_db,
};
use super::pool::DbPool;
use super::schema::{allotment_notifications, land_allocations, land_parcel_units, land_parcels};

/// Constraint guarding one allocation per member.
const MEMBER_UNIQUE_CONSTRAINT: &str = "land_allocations_member_id_key";

/// Diesel-backed implementation of [`LandAllocationRepository`].
#[derive(Clone)]
pub struct DieselLandAllocationRepository {
    pool: DbPool,
    statement_budget: Duration,
}

impl DieselLandAllocationRepository {
    /// Create a repository whose transactions wait at most `statement_budget`
    /// for the parcel lock and for any single statement.
    pub fn new(pool: DbPool, statement_budget: Duration) -> Self {
        Self {
            pool,
            statement_budget,
        }
    }
}

/// Failures raised inside the allocation transaction.
#[derive(Debug)]
enum AllocateFailure {
    Database(diesel::result::Error),
    ParcelNotFound,
    ParcelExhausted,
    Corrupt(String),
}

impl From<diesel::result::Error> for AllocateFailure {
    fn from(value: diesel::result::Error) -> Self {
        Self::Database(value)
    }
}

fn map_diesel_error(
    error: &diesel::result::Error,
    member_id: &MemberId,
) -> LandAllocationRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::Connection => {
            LandAllocationRepositoryError::connection("database connection error")
        }
        DieselFailure::Conflict(message) => LandAllocationRepositoryError::conflict(message),
        DieselFailure::Timeout(message) => LandAllocationRepositoryError::timeout(message),
        DieselFailure::UniqueViolation { constraint }
            if constraint.as_deref() == Some(MEMBER_UNIQUE_CONSTRAINT) =>
        {
            LandAllocationRepositoryError::member_already_allocated(member_id.as_ref())
        }
        DieselFailure::UniqueViolation { constraint } => {
            LandAllocationRepositoryError::query(format!(
                "unique constraint violated: {}",
                constraint.as_deref().unwrap_or("unknown")
            ))
        }
        DieselFailure::Query(message) => LandAllocationRepositoryError::query(message),
    }
}

fn budget_millis(budget: Duration) -> u128 {
    budget.as_millis().max(1)
}

async fn apply_statement_budget(
    conn: &mut AsyncPgConnection,
    budget: Duration,
) -> Result<(), diesel::result::Error> {
    let millis = budget_millis(budget);
    diesel::sql_query(format!("SET LOCAL lock_timeout = '{millis}ms'"))
        .execute(conn)
        .await?;
    diesel::sql_query(format!("SET LOCAL statement_timeout = '{millis}ms'"))
        .execute(conn)
        .await?;
    Ok(())
}

async fn lock_parcel(
    conn: &mut AsyncPgConnection,
    parcel_id: ParcelId,
) -> Result<LandParcel, AllocateFailure> {
    let row: Option<LandParcelRow> = land_parcels::table
        .find(*parcel_id.as_uuid())
        .select(LandParcelRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let row = row.ok_or(AllocateFailure::ParcelNotFound)?;
    row.into_domain().map_err(AllocateFailure::Corrupt)
}

async fn write_allocation(
    conn: &mut AsyncPgConnection,
    parcel_id: ParcelId,
    draft: AllocationDraft,
) -> Result<AllocatedLand, AllocateFailure> {
    let mut parcel = lock_parcel(conn, parcel_id).await?;
    let claim = parcel
        .claim_unit()
        .map_err(|_| AllocateFailure::ParcelExhausted)?;

    let parcel_uuid = *parcel_id.as_uuid();
    let units_available = count_to_db(claim.units_available_after(), "units_available")
        .map_err(AllocateFailure::Corrupt)?;
    let unit_number =
        count_to_db(claim.unit_number(), "unit_number").map_err(AllocateFailure::Corrupt)?;

    diesel::update(land_parcels::table.find(parcel_uuid))
        .set((
            land_parcels::units_available.eq(units_available),
            land_parcels::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await?;

    diesel::insert_into(land_parcel_units::table)
        .values(&NewLandParcelUnitRow {
            id: *draft.unit_id().as_uuid(),
            land_parcel_id: parcel_uuid,
            unit_number,
            status: LandUnitStatus::Allotted.as_str(),
            locked_until: draft.locked_until(),
            note: DIRECT_ALLOCATION_NOTE,
        })
        .execute(conn)
        .await?;

    diesel::insert_into(land_allocations::table)
        .values(&NewLandAllocationRow {
            id: *draft.allocation_id().as_uuid(),
            member_id: draft.member_id().as_ref(),
            land_parcel_unit_id: *draft.unit_id().as_uuid(),
            land_parcel_id: parcel_uuid,
            state_id: parcel.state_id(),
            status: AllocationStatus::Confirmed.as_str(),
            reference_no: draft.reference_no().as_ref(),
            allocated_at: draft.allocated_at(),
        })
        .execute(conn)
        .await?;

    diesel::insert_into(allotment_notifications::table)
        .values(&NewNotificationRow {
            id: Uuid::new_v4(),
            allocation_id: *draft.allocation_id().as_uuid(),
            member_id: draft.member_id().as_ref(),
            reference_no: draft.reference_no().as_ref(),
            status: OutboxStatus::Pending.as_str(),
            attempts: 0,
            next_attempt_at: draft.allocated_at(),
        })
        .execute(conn)
        .await?;

    Ok(draft.realise(parcel, claim))
}

fn notification_state(status: Option<&str>) -> Result<NotificationState, String> {
    match status {
        None => Ok(NotificationState::Queued),
        Some(value) if value == OutboxStatus::Pending.as_str() => Ok(NotificationState::Queued),
        Some(value) if value == OutboxStatus::Sent.as_str() => Ok(NotificationState::Sent),
        Some(value) if value == OutboxStatus::Failed.as_str() => Ok(NotificationState::Failed),
        Some(value) => Err(format!("invalid notification status in database: {value}")),
    }
}

type AllocationJoinRow = (
    LandAllocationRow,
    LandParcelUnitRow,
    LandParcelRow,
    Option<String>,
);

fn row_to_record(row: AllocationJoinRow) -> Result<AllocationRecord, LandAllocationRepositoryError> {
    let (allocation, unit, parcel, notification) = row;
    let land = AllocatedLand {
        allocation: allocation
            .into_domain()
            .map_err(LandAllocationRepositoryError::query)?,
        unit: unit.into_domain().map_err(LandAllocationRepositoryError::query)?,
        parcel: parcel
            .into_domain()
            .map_err(LandAllocationRepositoryError::query)?,
    };
    let notification =
        notification_state(notification.as_deref()).map_err(LandAllocationRepositoryError::query)?;
    Ok(AllocationRecord { land, notification })
}

#[async_trait]
impl LandAllocationRepository for DieselLandAllocationRepository {
    async fn find_by_member(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<AllocationRecord>, LandAllocationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LandAllocationRepositoryError::connection))?;

        let row: Option<AllocationJoinRow> = land_allocations::table
            .inner_join(
                land_parcel_units::table
                    .on(land_parcel_units::id.eq(land_allocations::land_parcel_unit_id)),
            )
            .inner_join(
                land_parcels::table.on(land_parcels::id.eq(land_allocations::land_parcel_id)),
            )
            .left_join(
                allotment_notifications::table
                    .on(allotment_notifications::allocation_id.eq(land_allocations::id)),
            )
            .filter(land_allocations::member_id.eq(member_id.as_ref()))
            .select((
                LandAllocationRow::as_select(),
                LandParcelUnitRow::as_select(),
                LandParcelRow::as_select(),
                allotment_notifications::status.nullable(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(&err, member_id))?;

        row.map(row_to_record).transpose()
    }

    async fn allocate(
        &self,
        parcel_id: ParcelId,
        draft: AllocationDraft,
    ) -> Result<AllocatedLand, LandAllocationRepositoryError> {
        let member_id = draft.member_id().clone();
        let budget = self.statement_budget;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LandAllocationRepositoryError::connection))?;

        let result = conn
            .transaction::<_, AllocateFailure, _>(|conn| {
                async move {
                    apply_statement_budget(conn, budget).await?;
                    write_allocation(conn, parcel_id, draft).await
                }
                .scope_boxed()
            })
            .await;

        result.map_err(|failure| match failure {
            AllocateFailure::Database(err) => {
                debug!(member_id = %member_id, parcel_id = %parcel_id, "allocation transaction rolled back");
                map_diesel_error(&err, &member_id)
            }
            AllocateFailure::ParcelNotFound => {
                LandAllocationRepositoryError::parcel_not_found(parcel_id)
            }
            AllocateFailure::ParcelExhausted => {
                LandAllocationRepositoryError::parcel_exhausted(parcel_id)
            }
            AllocateFailure::Corrupt(message) => LandAllocationRepositoryError::query(message),
        })
    }
}
