//! Land allocation domain service.
//!
//! Implements the allocation driving ports on top of the allocation and
//! parcel repositories. The repository owns the atomic write; this service
//! owns the pre-checks, the time budget, metrics and waking the notification
//! dispatcher once a transaction has committed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{error, info, warn};

use crate::domain::land::{
    AllocationDraft, AllocationRecord, MemberId, NotificationState, ParcelId,
};
use crate::domain::notification_dispatcher::DispatchSignal;
use crate::domain::ports::{
    AllocateLandRequest, AllocateLandResponse, AllocationMetrics, AllocationOutcome,
    GetAllocationRequest, LandAllocationCommand, LandAllocationQuery, LandAllocationRepository,
    LandParcelRepository, NoOpAllocationMetrics,
};
use crate::domain::{AllocationError, Error};

/// Default upper bound on one allocation transaction.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Static configuration for the allocation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandAllocationServiceConfig {
    /// Parcel every allocation draws from.
    pub parcel_id: ParcelId,
    /// Time budget for the locking transaction.
    pub transaction_timeout: Duration,
}

impl LandAllocationServiceConfig {
    pub fn new(parcel_id: ParcelId) -> Self {
        Self {
            parcel_id,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}

/// Allocation service implementing [`LandAllocationCommand`] and
/// [`LandAllocationQuery`].
#[derive(Clone)]
pub struct LandAllocationService<R, P> {
    allocations: Arc<R>,
    parcels: Arc<P>,
    metrics: Arc<dyn AllocationMetrics>,
    clock: Arc<dyn Clock>,
    dispatch: DispatchSignal,
    config: LandAllocationServiceConfig,
}

impl<R, P> LandAllocationService<R, P> {
    /// Create a service with no-op metrics.
    pub fn new(
        allocations: Arc<R>,
        parcels: Arc<P>,
        clock: Arc<dyn Clock>,
        dispatch: DispatchSignal,
        config: LandAllocationServiceConfig,
    ) -> Self {
        Self {
            allocations,
            parcels,
            metrics: Arc::new(NoOpAllocationMetrics),
            clock,
            dispatch,
            config,
        }
    }

    /// Replace the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn AllocationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl<R, P> LandAllocationService<R, P>
where
    R: LandAllocationRepository,
    P: LandParcelRepository,
{
    async fn try_allocate(&self, member_id: &MemberId) -> Result<AllocateLandResponse, AllocationError> {
        if self.allocations.find_by_member(member_id).await?.is_some() {
            return Err(AllocationError::AlreadyAllocated);
        }

        let parcel_id = self.config.parcel_id;
        if self.parcels.find_by_id(parcel_id).await?.is_none() {
            return Err(AllocationError::ParcelNotFound);
        }

        let draft = AllocationDraft::new(member_id.clone(), self.clock.utc()).map_err(|err| {
            AllocationError::Internal {
                message: err.to_string(),
            }
        })?;

        let allocation = tokio::time::timeout(
            self.config.transaction_timeout,
            self.allocations.allocate(parcel_id, draft),
        )
        .await
        .map_err(|_| AllocationError::TransactionTimeout)??;

        Ok(AllocateLandResponse {
            allocation,
            notification: NotificationState::Queued,
        })
    }

    async fn record(&self, outcome: AllocationOutcome) {
        if let Err(err) = self.metrics.record_allocation(outcome).await {
            warn!(error = %err, outcome = outcome.as_label(), "allocation metric write failed");
        }
    }
}

#[async_trait]
impl<R, P> LandAllocationCommand for LandAllocationService<R, P>
where
    R: LandAllocationRepository,
    P: LandParcelRepository,
{
    async fn allocate_land(
        &self,
        request: AllocateLandRequest,
    ) -> Result<AllocateLandResponse, Error> {
        let member_id = request.member_id;
        match self.try_allocate(&member_id).await {
            Ok(response) => {
                self.dispatch.wake();
                self.record(AllocationOutcome::Allocated).await;
                info!(
                    member_id = %member_id,
                    parcel_id = %response.allocation.parcel.id(),
                    unit_number = response.allocation.unit.unit_number,
                    reference_no = %response.allocation.allocation.reference_no,
                    "land allocated"
                );
                Ok(response)
            }
            Err(failure) => {
                self.record(failure.outcome()).await;
                match &failure {
                    AllocationError::Unavailable { .. } | AllocationError::Internal { .. } => {
                        error!(member_id = %member_id, error = %failure, "land allocation failed");
                    }
                    _ => {
                        info!(member_id = %member_id, reason = %failure, "land allocation refused");
                    }
                }
                Err(failure.into())
            }
        }
    }
}

#[async_trait]
impl<R, P> LandAllocationQuery for LandAllocationService<R, P>
where
    R: LandAllocationRepository,
    P: LandParcelRepository,
{
    async fn get_allocation(
        &self,
        request: GetAllocationRequest,
    ) -> Result<AllocationRecord, Error> {
        self.allocations
            .find_by_member(&request.member_id)
            .await
            .map_err(|err| {
                let failure = AllocationError::from(err);
                error!(member_id = %request.member_id, error = %failure, "land allocation lookup failed");
                Error::from(failure)
            })?
            .ok_or_else(|| Error::not_found("no land allocation for member"))
    }
}

#[cfg(test)]
#[path = "land_allocation_service_tests.rs"]
mod tests;
