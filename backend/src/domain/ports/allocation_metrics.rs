//! Domain port surface for recording allocation and notification outcomes.
//!
//! Implementations may export to Prometheus or discard the events in tests.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording allocation metrics.
    pub enum AllocationMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "allocation metrics exporter failed: {message}",
    }
}

/// Terminal outcome of one allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationOutcome {
    Allocated,
    AlreadyAllocated,
    ParcelNotFound,
    NoUnitsAvailable,
    Conflict,
    Timeout,
    Error,
}

impl AllocationOutcome {
    /// Label value used by metric exporters.
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::AlreadyAllocated => "already_allocated",
            Self::ParcelNotFound => "parcel_not_found",
            Self::NoUnitsAvailable => "no_units_available",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

/// Outcome of one notification delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationOutcome {
    Sent,
    Retried,
    Failed,
}

impl NotificationOutcome {
    /// Label value used by metric exporters.
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Retried => "retried",
            Self::Failed => "failed",
        }
    }
}

/// Metrics recording port for the allotment flow.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AllocationMetrics: Send + Sync {
    /// Record how an allocation attempt ended.
    async fn record_allocation(
        &self,
        outcome: AllocationOutcome,
    ) -> Result<(), AllocationMetricsError>;

    /// Record how a notification delivery attempt ended.
    async fn record_notification(
        &self,
        outcome: NotificationOutcome,
    ) -> Result<(), AllocationMetricsError>;
}

/// No-op implementation for when metrics are disabled or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAllocationMetrics;

#[async_trait]
impl AllocationMetrics for NoOpAllocationMetrics {
    async fn record_allocation(
        &self,
        _outcome: AllocationOutcome,
    ) -> Result<(), AllocationMetricsError> {
        Ok(())
    }

    async fn record_notification(
        &self,
        _outcome: NotificationOutcome,
    ) -> Result<(), AllocationMetricsError> {
        Ok(())
    }
}
