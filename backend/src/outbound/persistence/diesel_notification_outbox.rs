//! PostgreSQL-backed `NotificationOutbox` using Diesel ORM.
//!
//! Claiming is a single `UPDATE ... WHERE id IN (SELECT ... FOR UPDATE SKIP
//! LOCKED)` statement: rows locked by another worker are skipped and the
//! claimed rows have `next_attempt_at` pushed out by the lease before the
//! statement returns, so no two workers hold the same row at once.
//!
//! Settling matches on the `next_attempt_at` the claim returned. Once a lease
//! lapses and another worker reclaims the row, the stale holder's update
//! matches nothing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Timestamptz, Varchar};
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::land::{AllocationId, MemberId, ReferenceNumber};
use crate::domain::ports::{
    NotificationOutbox, NotificationOutboxError, OutboxClaim, OutboxMessage, OutboxStatus,
};

use super::diesel_error_mapping::{map_basic_diesel_error, map_pool_error};
use super::models::{ClaimedNotificationRow, count_from_db, count_to_db};
use super::pool::DbPool;
use super::schema::allotment_notifications;

const CLAIM_DUE_SQL: &str = "\
UPDATE allotment_notifications \
SET next_attempt_at = $2, updated_at = $1 \
WHERE id IN ( \
    SELECT id FROM allotment_notifications \
    WHERE status = $3 AND next_attempt_at <= $1 \
    ORDER BY next_attempt_at \
    LIMIT $4 \
    FOR UPDATE SKIP LOCKED \
) \
RETURNING id, allocation_id, member_id, reference_no, attempts, next_attempt_at";

/// Diesel-backed implementation of [`NotificationOutbox`].
#[derive(Clone)]
pub struct DieselNotificationOutbox {
    pool: DbPool,
}

impl DieselNotificationOutbox {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: &diesel::result::Error) -> NotificationOutboxError {
    map_basic_diesel_error(
        error,
        NotificationOutboxError::query,
        NotificationOutboxError::connection,
    )
}

fn row_to_message(row: ClaimedNotificationRow) -> Result<OutboxMessage, NotificationOutboxError> {
    Ok(OutboxMessage {
        id: row.id,
        allocation_id: AllocationId::from_uuid(row.allocation_id),
        member_id: MemberId::new(row.member_id).map_err(|err| {
            NotificationOutboxError::query(format!("invalid member id in outbox: {err}"))
        })?,
        reference_no: ReferenceNumber::parse(row.reference_no).map_err(|err| {
            NotificationOutboxError::query(format!("invalid reference number in outbox: {err}"))
        })?,
        attempts: count_from_db(row.attempts, "attempts").map_err(NotificationOutboxError::query)?,
        leased_until: row.next_attempt_at,
    })
}

fn attempts_to_db(attempts: u32) -> Result<i32, NotificationOutboxError> {
    count_to_db(attempts, "attempts").map_err(NotificationOutboxError::query)
}

/// Rows still held by `claim`.
macro_rules! held_by {
    ($claim:expr) => {
        allotment_notifications::table
            .find($claim.id)
            .filter(allotment_notifications::status.eq(OutboxStatus::Pending.as_str()))
            .filter(allotment_notifications::next_attempt_at.eq($claim.leased_until))
    };
}

impl DieselNotificationOutbox {
    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, NotificationOutboxError> {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NotificationOutboxError::connection))
    }
}

#[async_trait]
impl NotificationOutbox for DieselNotificationOutbox {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
        lease: Duration,
    ) -> Result<Vec<OutboxMessage>, NotificationOutboxError> {
        let lease = TimeDelta::from_std(lease)
            .map_err(|err| NotificationOutboxError::query(format!("invalid lease: {err}")))?;
        let lease_expiry = now
            .checked_add_signed(lease)
            .ok_or_else(|| NotificationOutboxError::query("lease expiry out of range"))?;
        let mut conn = self.connection().await?;

        let rows: Vec<ClaimedNotificationRow> = diesel::sql_query(CLAIM_DUE_SQL)
            .bind::<Timestamptz, _>(now)
            .bind::<Timestamptz, _>(lease_expiry)
            .bind::<Varchar, _>(OutboxStatus::Pending.as_str())
            .bind::<BigInt, _>(i64::from(limit))
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows.into_iter().map(row_to_message).collect()
    }

    async fn mark_sent(
        &self,
        claim: OutboxClaim,
        attempts: u32,
        delivered_at: DateTime<Utc>,
    ) -> Result<bool, NotificationOutboxError> {
        let attempts = attempts_to_db(attempts)?;
        let mut conn = self.connection().await?;
        let updated = diesel::update(held_by!(claim))
            .set((
                allotment_notifications::status.eq(OutboxStatus::Sent.as_str()),
                allotment_notifications::attempts.eq(attempts),
                allotment_notifications::delivered_at.eq(Some(delivered_at)),
                allotment_notifications::last_error.eq(None::<String>),
                allotment_notifications::updated_at.eq(delivered_at),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;
        Ok(updated > 0)
    }

    async fn reschedule(
        &self,
        claim: OutboxClaim,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<bool, NotificationOutboxError> {
        let attempts = attempts_to_db(attempts)?;
        let mut conn = self.connection().await?;
        let updated = diesel::update(held_by!(claim))
            .set((
                allotment_notifications::attempts.eq(attempts),
                allotment_notifications::next_attempt_at.eq(next_attempt_at),
                allotment_notifications::last_error.eq(Some(last_error.to_owned())),
                allotment_notifications::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;
        Ok(updated > 0)
    }

    async fn mark_failed(
        &self,
        claim: OutboxClaim,
        attempts: u32,
        last_error: &str,
    ) -> Result<bool, NotificationOutboxError> {
        let attempts = attempts_to_db(attempts)?;
        let mut conn = self.connection().await?;
        let updated = diesel::update(held_by!(claim))
            .set((
                allotment_notifications::status.eq(OutboxStatus::Failed.as_str()),
                allotment_notifications::attempts.eq(attempts),
                allotment_notifications::last_error.eq(Some(last_error.to_owned())),
                allotment_notifications::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;
        Ok(updated > 0)
    }

    async fn requeue_for_member(
        &self,
        member_id: &MemberId,
        now: DateTime<Utc>,
    ) -> Result<bool, NotificationOutboxError> {
        let mut conn = self.connection().await?;

        let updated = diesel::update(
            allotment_notifications::table
                .filter(allotment_notifications::member_id.eq(member_id.as_ref())),
        )
        .set((
            allotment_notifications::status.eq(OutboxStatus::Pending.as_str()),
            allotment_notifications::attempts.eq(0),
            allotment_notifications::next_attempt_at.eq(now),
            allotment_notifications::delivered_at.eq(None::<DateTime<Utc>>),
            allotment_notifications::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(&err))?;

        Ok(updated > 0)
    }
}
