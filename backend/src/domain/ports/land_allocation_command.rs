//! Driving port for allocating land to a member.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::land::{AllocatedLand, MemberId, NotificationState};

/// Request to allocate one land unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateLandRequest {
    pub member_id: MemberId,
}

/// Response from a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateLandResponse {
    pub allocation: AllocatedLand,
    /// Always [`NotificationState::Queued`]: delivery happens after commit.
    pub notification: NotificationState,
}

/// Driving port for land allocation writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LandAllocationCommand: Send + Sync {
    /// Allocate one unit of the configured parcel to the member.
    ///
    /// Callers should handle `Result::Err(Error)` at the boundary; the
    /// `details.code` field distinguishes `already_allocated`,
    /// `no_units_available`, `parcel_not_found`, `transaction_conflict` and
    /// `transaction_timeout`.
    async fn allocate_land(
        &self,
        request: AllocateLandRequest,
    ) -> Result<AllocateLandResponse, Error>;
}

/// Fixture command that reports an exhausted parcel.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLandAllocationCommand;

#[async_trait]
impl LandAllocationCommand for FixtureLandAllocationCommand {
    async fn allocate_land(
        &self,
        _request: AllocateLandRequest,
    ) -> Result<AllocateLandResponse, Error> {
        Err(crate::domain::AllocationError::NoUnitsAvailable.into())
    }
}
