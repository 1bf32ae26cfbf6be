//! Failure taxonomy for land allocation attempts.
//!
//! Every variant maps onto the transport-agnostic [`Error`] with a stable
//! `details.code` so clients can branch without parsing messages.

use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::{
    AllocationOutcome, LandAllocationRepositoryError, LandParcelRepositoryError,
};

/// Why an allocation attempt did not produce an allocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The member already holds an allocation.
    #[error("member already holds a land allocation")]
    AlreadyAllocated,
    /// The configured parcel does not exist.
    #[error("configured land parcel does not exist")]
    ParcelNotFound,
    /// The parcel has no units left.
    #[error("no land units are available")]
    NoUnitsAvailable,
    /// The database aborted the transaction to resolve a race.
    #[error("allocation conflicted with a concurrent request")]
    TransactionConflict,
    /// The transaction did not finish within its time budget.
    #[error("allocation transaction timed out")]
    TransactionTimeout,
    /// Storage could not be reached.
    #[error("land allocation storage unavailable: {message}")]
    Unavailable { message: String },
    /// Anything else.
    #[error("land allocation failed: {message}")]
    Internal { message: String },
}

impl AllocationError {
    /// Metric outcome for this failure.
    pub const fn outcome(&self) -> AllocationOutcome {
        match self {
            Self::AlreadyAllocated => AllocationOutcome::AlreadyAllocated,
            Self::ParcelNotFound => AllocationOutcome::ParcelNotFound,
            Self::NoUnitsAvailable => AllocationOutcome::NoUnitsAvailable,
            Self::TransactionConflict => AllocationOutcome::Conflict,
            Self::TransactionTimeout => AllocationOutcome::Timeout,
            Self::Unavailable { .. } | Self::Internal { .. } => AllocationOutcome::Error,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransactionConflict | Self::TransactionTimeout | Self::Unavailable { .. }
        )
    }
}

impl From<LandAllocationRepositoryError> for AllocationError {
    fn from(value: LandAllocationRepositoryError) -> Self {
        match value {
            LandAllocationRepositoryError::Connection { message } => Self::Unavailable { message },
            LandAllocationRepositoryError::Query { message } => Self::Internal { message },
            LandAllocationRepositoryError::ParcelNotFound { .. } => Self::ParcelNotFound,
            LandAllocationRepositoryError::ParcelExhausted { .. } => Self::NoUnitsAvailable,
            LandAllocationRepositoryError::MemberAlreadyAllocated { .. } => Self::AlreadyAllocated,
            LandAllocationRepositoryError::Conflict { .. } => Self::TransactionConflict,
            LandAllocationRepositoryError::Timeout { .. } => Self::TransactionTimeout,
        }
    }
}

impl From<LandParcelRepositoryError> for AllocationError {
    fn from(value: LandParcelRepositoryError) -> Self {
        match value {
            LandParcelRepositoryError::Connection { message } => Self::Unavailable { message },
            LandParcelRepositoryError::Query { message } => Self::Internal { message },
        }
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        match value {
            AllocationError::AlreadyAllocated => {
                Error::invalid_request("land has already been allocated to this member")
                    .with_details(json!({ "code": "already_allocated" }))
            }
            AllocationError::NoUnitsAvailable => {
                Error::invalid_request("no land units are available")
                    .with_details(json!({ "code": "no_units_available" }))
            }
            AllocationError::ParcelNotFound => Error::not_found("land parcel not found")
                .with_details(json!({ "code": "parcel_not_found" })),
            AllocationError::TransactionConflict => {
                Error::conflict("allocation conflicted with a concurrent request")
                    .with_details(json!({ "code": "transaction_conflict", "retryable": true }))
            }
            AllocationError::TransactionTimeout => {
                Error::service_unavailable("allocation timed out")
                    .with_details(json!({ "code": "transaction_timeout", "retryable": true }))
            }
            AllocationError::Unavailable { .. } => {
                Error::service_unavailable("land allocation storage unavailable")
                    .with_details(json!({ "code": "storage_unavailable", "retryable": true }))
            }
            AllocationError::Internal { message } => {
                Error::internal(format!("land allocation failed: {message}"))
            }
        }
    }
}
