//! Driving port for reading a member's allocation.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::land::{AllocationRecord, MemberId};

/// Request for the allocation held by a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAllocationRequest {
    pub member_id: MemberId,
}

/// Driving port for land allocation reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LandAllocationQuery: Send + Sync {
    /// Return the member's allocation or a `NotFound` error.
    async fn get_allocation(&self, request: GetAllocationRequest)
    -> Result<AllocationRecord, Error>;
}

/// Fixture query for members without allocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLandAllocationQuery;

#[async_trait]
impl LandAllocationQuery for FixtureLandAllocationQuery {
    async fn get_allocation(
        &self,
        _request: GetAllocationRequest,
    ) -> Result<AllocationRecord, Error> {
        Err(Error::not_found("no land allocation for member"))
    }
}
