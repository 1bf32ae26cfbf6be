//! Allocation records and the draft that produces them.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    AllocationId, AllocationStatus, LandParcel, LandUnitStatus, LandValidationError, MemberId,
    ParcelId, ReferenceNumber, UnitClaim, UnitId,
};

/// Lock period applied to directly allocated units.
pub const LOCK_TERM_MONTHS: u32 = 60;

/// Note recorded on units created by the direct allocation path.
pub const DIRECT_ALLOCATION_NOTE: &str = "Direct allocation";

/// A unit carved out of a parcel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandParcelUnit {
    pub id: UnitId,
    pub parcel_id: ParcelId,
    pub unit_number: u32,
    pub status: LandUnitStatus,
    pub locked_until: DateTime<Utc>,
    pub note: String,
}

/// The record binding one member to one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandAllocation {
    pub id: AllocationId,
    pub member_id: MemberId,
    pub unit_id: UnitId,
    pub parcel_id: ParcelId,
    pub state_id: Uuid,
    pub status: AllocationStatus,
    pub reference_no: ReferenceNumber,
    pub allocated_at: DateTime<Utc>,
}

/// An allocation together with the denormalised unit and parcel data a
/// confirmation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedLand {
    pub allocation: LandAllocation,
    pub unit: LandParcelUnit,
    pub parcel: LandParcel,
}

/// Delivery state of the member's allotment notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    /// Written to the outbox and awaiting delivery.
    Queued,
    /// Accepted by the mailer.
    Sent,
    /// Abandoned after a permanent failure or too many attempts.
    Failed,
}

/// A member's allocation as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub land: AllocatedLand,
    pub notification: NotificationState,
}

/// Everything about a new allocation that does not depend on the locked
/// parcel row.
///
/// Identifiers, the reference number and timestamps are fixed before the
/// transaction opens; the unit number is filled in from the [`UnitClaim`]
/// made while the parcel row is locked.
///
/// # Examples
/// ```
/// use allotment::domain::land::{AllocationDraft, MemberId};
/// use chrono::{TimeZone, Utc};
///
/// let allocated_at = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
/// let draft = AllocationDraft::new(MemberId::new("member-1").unwrap(), allocated_at)
///     .expect("lock term in range");
/// assert_eq!(
///     draft.locked_until(),
///     Utc.with_ymd_and_hms(2029, 2, 28, 12, 0, 0).unwrap()
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDraft {
    allocation_id: AllocationId,
    unit_id: UnitId,
    member_id: MemberId,
    reference_no: ReferenceNumber,
    allocated_at: DateTime<Utc>,
    locked_until: DateTime<Utc>,
}

impl AllocationDraft {
    /// Prepare a draft for `member_id` at `allocated_at` with fresh ids.
    pub fn new(member_id: MemberId, allocated_at: DateTime<Utc>) -> Result<Self, LandValidationError> {
        let locked_until = allocated_at
            .checked_add_months(Months::new(LOCK_TERM_MONTHS))
            .ok_or(LandValidationError::LockTermOutOfRange)?;
        Ok(Self {
            allocation_id: AllocationId::random(),
            unit_id: UnitId::random(),
            member_id,
            reference_no: ReferenceNumber::generate(),
            allocated_at,
            locked_until,
        })
    }

    pub const fn allocation_id(&self) -> AllocationId {
        self.allocation_id
    }

    pub const fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub const fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    pub const fn reference_no(&self) -> &ReferenceNumber {
        &self.reference_no
    }

    pub const fn allocated_at(&self) -> DateTime<Utc> {
        self.allocated_at
    }

    pub const fn locked_until(&self) -> DateTime<Utc> {
        self.locked_until
    }

    /// Combine the draft with a claim made against `parcel`.
    ///
    /// `parcel` must be the post-claim snapshot so the returned record
    /// reflects the decremented availability.
    pub fn realise(self, parcel: LandParcel, claim: UnitClaim) -> AllocatedLand {
        let unit = LandParcelUnit {
            id: self.unit_id,
            parcel_id: parcel.id(),
            unit_number: claim.unit_number(),
            status: LandUnitStatus::Allotted,
            locked_until: self.locked_until,
            note: DIRECT_ALLOCATION_NOTE.to_owned(),
        };
        let allocation = LandAllocation {
            id: self.allocation_id,
            member_id: self.member_id,
            unit_id: self.unit_id,
            parcel_id: parcel.id(),
            state_id: parcel.state_id(),
            status: AllocationStatus::Confirmed,
            reference_no: self.reference_no,
            allocated_at: self.allocated_at,
        };
        AllocatedLand {
            allocation,
            unit,
            parcel,
        }
    }
}
