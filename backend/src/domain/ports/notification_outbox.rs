//! Port for the allotment notification outbox.
//!
//! Rows are written by the allocation transaction and drained by the
//! notification dispatcher. Claims are leases: a claimed row becomes due
//! again once its lease lapses, so a crashed worker never strands a
//! message. Settling requires the claim to still be held; a worker whose
//! lease lapsed and was taken over leaves the row to the new holder.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::land::{AllocationId, MemberId, NotificationState, ReferenceNumber};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification outbox adapters.
    pub enum NotificationOutboxError {
        /// Outbox connection could not be established.
        Connection { message: String } =>
            "notification outbox connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "notification outbox query failed: {message}",
    }
}

/// Delivery state of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl From<OutboxStatus> for NotificationState {
    fn from(value: OutboxStatus) -> Self {
        match value {
            OutboxStatus::Pending => Self::Queued,
            OutboxStatus::Sent => Self::Sent,
            OutboxStatus::Failed => Self::Failed,
        }
    }
}

/// Proof of one claim on an outbox row.
///
/// `leased_until` is the `next_attempt_at` the claim wrote; any later claim
/// or requeue rewrites it, which invalidates this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxClaim {
    pub id: Uuid,
    pub leased_until: DateTime<Utc>,
}

/// A claimed outbox row awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub allocation_id: AllocationId,
    pub member_id: MemberId,
    pub reference_no: ReferenceNumber,
    /// Delivery attempts made before this claim.
    pub attempts: u32,
    /// When this claim lapses and the row becomes claimable again.
    pub leased_until: DateTime<Utc>,
}

impl OutboxMessage {
    /// The claim needed to settle this message.
    pub const fn claim(&self) -> OutboxClaim {
        OutboxClaim {
            id: self.id,
            leased_until: self.leased_until,
        }
    }
}

/// Port for claiming and settling queued allotment notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationOutbox: Send + Sync {
    /// Claim up to `limit` pending rows due at `now`, pushing each claimed
    /// row's next attempt out by `lease`.
    ///
    /// Rows locked by a concurrent claimer are skipped.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
        lease: Duration,
    ) -> Result<Vec<OutboxMessage>, NotificationOutboxError>;

    /// Record a successful delivery.
    ///
    /// Returns `false`, leaving the row untouched, when `claim` is no longer
    /// held.
    async fn mark_sent(
        &self,
        claim: OutboxClaim,
        attempts: u32,
        delivered_at: DateTime<Utc>,
    ) -> Result<bool, NotificationOutboxError>;

    /// Record a failed attempt and schedule the next one.
    ///
    /// Returns `false` when `claim` is no longer held.
    async fn reschedule(
        &self,
        claim: OutboxClaim,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<bool, NotificationOutboxError>;

    /// Record a failed attempt and stop retrying.
    ///
    /// Returns `false` when `claim` is no longer held.
    async fn mark_failed(
        &self,
        claim: OutboxClaim,
        attempts: u32,
        last_error: &str,
    ) -> Result<bool, NotificationOutboxError>;

    /// Make the member's notification due again regardless of its state.
    ///
    /// Returns `false` when the member has no queued notification.
    async fn requeue_for_member(
        &self,
        member_id: &MemberId,
        now: DateTime<Utc>,
    ) -> Result<bool, NotificationOutboxError>;
}
