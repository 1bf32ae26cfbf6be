//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod allocation_metrics;
mod allotment_notifier;
mod land_allocation_command;
mod land_allocation_query;
mod land_allocation_repository;
mod land_parcel_repository;
mod notification_outbox;

#[cfg(test)]
pub use allocation_metrics::MockAllocationMetrics;
pub use allocation_metrics::{
    AllocationMetrics, AllocationMetricsError, AllocationOutcome, NoOpAllocationMetrics,
    NotificationOutcome,
};
#[cfg(test)]
pub use allotment_notifier::MockAllotmentNotifier;
pub use allotment_notifier::{AllotmentNotification, AllotmentNotifier, AllotmentNotifierError};
#[cfg(test)]
pub use land_allocation_command::MockLandAllocationCommand;
pub use land_allocation_command::{
    AllocateLandRequest, AllocateLandResponse, FixtureLandAllocationCommand,
    LandAllocationCommand,
};
#[cfg(test)]
pub use land_allocation_query::MockLandAllocationQuery;
pub use land_allocation_query::{
    FixtureLandAllocationQuery, GetAllocationRequest, LandAllocationQuery,
};
#[cfg(test)]
pub use land_allocation_repository::MockLandAllocationRepository;
pub use land_allocation_repository::{LandAllocationRepository, LandAllocationRepositoryError};
#[cfg(test)]
pub use land_parcel_repository::MockLandParcelRepository;
pub use land_parcel_repository::{
    LandParcelRepository, LandParcelRepositoryError, ParcelProvisioning,
};
#[cfg(test)]
pub use notification_outbox::MockNotificationOutbox;
pub use notification_outbox::{
    NotificationOutbox, NotificationOutboxError, OutboxClaim, OutboxMessage, OutboxStatus,
};
