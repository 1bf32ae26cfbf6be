//! Land parcel, unit, and allocation domain types.
//!
//! A parcel is an inventory pool with a fixed capacity. Allocating land
//! carves one unit out of that capacity and binds it to a member through an
//! allocation record. The arithmetic that derives unit sequence numbers
//! lives here so every adapter agrees on it.

use std::fmt;

mod allocation;
mod ids;
mod parcel;
mod status;
#[cfg(test)]
mod tests;

pub use allocation::{
    AllocatedLand, AllocationDraft, AllocationRecord, DIRECT_ALLOCATION_NOTE, LOCK_TERM_MONTHS,
    LandAllocation, LandParcelUnit, NotificationState,
};
pub use ids::{AllocationId, MemberId, ParcelId, ReferenceNumber, UnitId};
pub use parcel::{LandParcel, LandParcelDraft, UnitClaim};
pub use status::{AllocationStatus, LandUnitStatus, ParseAllocationStatusError, ParseLandUnitStatusError};

/// Validation errors raised by land domain constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandValidationError {
    EmptyMemberId,
    MemberIdWhitespace,
    MemberIdTooLong { max: usize },
    InvalidReferenceNumber,
    BlankParcelTitle,
    BlankSurveyNumber,
    AvailabilityExceedsTotal { available: u32, total: u32 },
    ParcelExhausted,
    LockTermOutOfRange,
}

impl fmt::Display for LandValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMemberId => write!(f, "member id must not be empty"),
            Self::MemberIdWhitespace => {
                write!(f, "member id must not have surrounding whitespace")
            }
            Self::MemberIdTooLong { max } => {
                write!(f, "member id must be at most {max} characters")
            }
            Self::InvalidReferenceNumber => write!(f, "reference number is malformed"),
            Self::BlankParcelTitle => write!(f, "parcel title must not be blank"),
            Self::BlankSurveyNumber => write!(f, "parcel survey number must not be blank"),
            Self::AvailabilityExceedsTotal { available, total } => write!(
                f,
                "parcel units_available ({available}) must not exceed units_total ({total})"
            ),
            Self::ParcelExhausted => write!(f, "parcel has no units available"),
            Self::LockTermOutOfRange => {
                write!(f, "unit lock expiry falls outside the representable range")
            }
        }
    }
}

impl std::error::Error for LandValidationError {}
