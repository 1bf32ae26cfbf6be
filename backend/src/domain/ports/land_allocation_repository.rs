//! Port for the atomic land allocation write and allocation reads.
//!
//! `allocate` is the only operation allowed to mutate a parcel's
//! availability. Adapters must perform the availability re-check, the
//! decrement, the unit insert, the allocation insert and the notification
//! outbox insert inside one transaction that holds a row lock on the parcel.

use async_trait::async_trait;

use crate::domain::land::{AllocatedLand, AllocationDraft, AllocationRecord, MemberId, ParcelId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by land allocation repository adapters.
    pub enum LandAllocationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "land allocation repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "land allocation repository query failed: {message}",
        /// The parcel row did not exist when the transaction locked it.
        ParcelNotFound { parcel_id: ParcelId } =>
            "land parcel {parcel_id} does not exist",
        /// The parcel had no units left when the transaction locked it.
        ParcelExhausted { parcel_id: ParcelId } =>
            "land parcel {parcel_id} has no units available",
        /// The member already holds an allocation.
        MemberAlreadyAllocated { member_id: String } =>
            "member {member_id} already holds a land allocation",
        /// The database aborted the transaction to resolve a conflict.
        Conflict { message: String } =>
            "land allocation transaction conflicted: {message}",
        /// The transaction exceeded its lock or statement budget.
        Timeout { message: String } =>
            "land allocation transaction timed out: {message}",
    }
}

/// Port for allocating land units and reading allocations back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LandAllocationRepository: Send + Sync {
    /// Look up the allocation held by a member, if any, together with the
    /// state of its notification.
    async fn find_by_member(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<AllocationRecord>, LandAllocationRepositoryError>;

    /// Atomically claim one unit of `parcel_id` for the draft's member and
    /// queue the allotment notification.
    ///
    /// Either every row is written or none is.
    async fn allocate(
        &self,
        parcel_id: ParcelId,
        draft: AllocationDraft,
    ) -> Result<AllocatedLand, LandAllocationRepositoryError>;
}
