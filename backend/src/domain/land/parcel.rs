//! Land parcel inventory pools.

use uuid::Uuid;

use super::{LandValidationError, ParcelId};

/// Input payload for [`LandParcel::new`].
#[derive(Debug, Clone)]
pub struct LandParcelDraft {
    pub id: ParcelId,
    pub title: String,
    pub survey_number: String,
    pub address_line: Option<String>,
    pub state_id: Uuid,
    pub units_total: u32,
    pub units_available: u32,
}

/// An inventory pool of land units with fixed capacity.
///
/// ## Invariants
/// - `units_available <= units_total`.
///
/// # Examples
/// ```
/// use allotment::domain::land::{LandParcel, LandParcelDraft, ParcelId};
/// use uuid::Uuid;
///
/// let mut parcel = LandParcel::new(LandParcelDraft {
///     id: ParcelId::random(),
///     title: "North Block".to_owned(),
///     survey_number: "SY-101".to_owned(),
///     address_line: None,
///     state_id: Uuid::new_v4(),
///     units_total: 10,
///     units_available: 10,
/// })
/// .expect("valid parcel");
/// let claim = parcel.claim_unit().expect("capacity remains");
/// assert_eq!(claim.unit_number(), 1);
/// assert_eq!(parcel.units_available(), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandParcel {
    id: ParcelId,
    title: String,
    survey_number: String,
    address_line: Option<String>,
    state_id: Uuid,
    units_total: u32,
    units_available: u32,
}

/// The outcome of carving one unit out of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitClaim {
    unit_number: u32,
    units_available_after: u32,
}

impl UnitClaim {
    /// Sequence number assigned to the new unit. Always at least 1.
    pub const fn unit_number(&self) -> u32 {
        self.unit_number
    }

    /// Parcel availability after the claim.
    pub const fn units_available_after(&self) -> u32 {
        self.units_available_after
    }
}

impl LandParcel {
    /// Creates a validated parcel.
    pub fn new(draft: LandParcelDraft) -> Result<Self, LandValidationError> {
        if draft.title.trim().is_empty() {
            return Err(LandValidationError::BlankParcelTitle);
        }
        if draft.survey_number.trim().is_empty() {
            return Err(LandValidationError::BlankSurveyNumber);
        }
        if draft.units_available > draft.units_total {
            return Err(LandValidationError::AvailabilityExceedsTotal {
                available: draft.units_available,
                total: draft.units_total,
            });
        }
        Ok(Self {
            id: draft.id,
            title: draft.title,
            survey_number: draft.survey_number,
            address_line: draft.address_line.filter(|line| !line.trim().is_empty()),
            state_id: draft.state_id,
            units_total: draft.units_total,
            units_available: draft.units_available,
        })
    }

    pub const fn id(&self) -> ParcelId {
        self.id
    }

    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    pub fn survey_number(&self) -> &str {
        self.survey_number.as_str()
    }

    pub fn address_line(&self) -> Option<&str> {
        self.address_line.as_deref()
    }

    /// Region the parcel belongs to; copied onto every allocation.
    pub const fn state_id(&self) -> Uuid {
        self.state_id
    }

    pub const fn units_total(&self) -> u32 {
        self.units_total
    }

    pub const fn units_available(&self) -> u32 {
        self.units_available
    }

    /// Number of units already carved out of the parcel.
    pub const fn units_allotted(&self) -> u32 {
        self.units_total - self.units_available
    }

    /// Decrement availability by one and derive the new unit's sequence
    /// number as `units_total - units_available_after`.
    ///
    /// Returns [`LandValidationError::ParcelExhausted`] and leaves the parcel
    /// untouched when no units remain.
    pub fn claim_unit(&mut self) -> Result<UnitClaim, LandValidationError> {
        let Some(units_available_after) = self.units_available.checked_sub(1) else {
            return Err(LandValidationError::ParcelExhausted);
        };
        self.units_available = units_available_after;
        Ok(UnitClaim {
            unit_number: self.units_total - units_available_after,
            units_available_after,
        })
    }
}
