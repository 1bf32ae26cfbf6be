//! Internal Diesel row structs for the allotment tables.
//!
//! These types never leave the persistence layer. Conversions into domain
//! types report corrupt rows as plain messages; each adapter wraps them in
//! its own query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::land::{
    AllocationId, LandAllocation, LandParcel, LandParcelDraft, LandParcelUnit, MemberId, ParcelId,
    ReferenceNumber, UnitId,
};

use super::schema::{allotment_notifications, land_allocations, land_parcel_units, land_parcels};

/// Convert a stored `integer` count into the domain's unsigned form.
pub(crate) fn count_from_db(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("negative {column} in database: {value}"))
}

/// Convert a domain count into the `integer` column type.
pub(crate) fn count_to_db(value: u32, column: &str) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("{column} exceeds database range: {value}"))
}

// ---------------------------------------------------------------------------
// Parcels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = land_parcels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LandParcelRow {
    pub id: Uuid,
    pub title: String,
    pub survey_number: String,
    pub address_line: Option<String>,
    pub state_id: Uuid,
    pub units_total: i32,
    pub units_available: i32,
}

impl LandParcelRow {
    pub(crate) fn into_domain(self) -> Result<LandParcel, String> {
        LandParcel::new(LandParcelDraft {
            id: ParcelId::from_uuid(self.id),
            title: self.title,
            survey_number: self.survey_number,
            address_line: self.address_line,
            state_id: self.state_id,
            units_total: count_from_db(self.units_total, "units_total")?,
            units_available: count_from_db(self.units_available, "units_available")?,
        })
        .map_err(|err| format!("invalid land parcel {}: {err}", self.id))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = land_parcels)]
pub(crate) struct NewLandParcelRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub survey_number: &'a str,
    pub address_line: Option<&'a str>,
    pub state_id: Uuid,
    pub units_total: i32,
    pub units_available: i32,
}

impl<'a> NewLandParcelRow<'a> {
    pub(crate) fn from_domain(parcel: &'a LandParcel) -> Result<Self, String> {
        Ok(Self {
            id: *parcel.id().as_uuid(),
            title: parcel.title(),
            survey_number: parcel.survey_number(),
            address_line: parcel.address_line(),
            state_id: parcel.state_id(),
            units_total: count_to_db(parcel.units_total(), "units_total")?,
            units_available: count_to_db(parcel.units_available(), "units_available")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = land_parcel_units)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LandParcelUnitRow {
    pub id: Uuid,
    pub land_parcel_id: Uuid,
    pub unit_number: i32,
    pub status: String,
    pub locked_until: DateTime<Utc>,
    pub note: String,
}

impl LandParcelUnitRow {
    pub(crate) fn into_domain(self) -> Result<LandParcelUnit, String> {
        let status = self
            .status
            .parse()
            .map_err(|_| format!("invalid unit status in database: {}", self.status))?;
        Ok(LandParcelUnit {
            id: UnitId::from_uuid(self.id),
            parcel_id: ParcelId::from_uuid(self.land_parcel_id),
            unit_number: count_from_db(self.unit_number, "unit_number")?,
            status,
            locked_until: self.locked_until,
            note: self.note,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = land_parcel_units)]
pub(crate) struct NewLandParcelUnitRow<'a> {
    pub id: Uuid,
    pub land_parcel_id: Uuid,
    pub unit_number: i32,
    pub status: &'a str,
    pub locked_until: DateTime<Utc>,
    pub note: &'a str,
}

// ---------------------------------------------------------------------------
// Allocations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = land_allocations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LandAllocationRow {
    pub id: Uuid,
    pub member_id: String,
    pub land_parcel_unit_id: Uuid,
    pub land_parcel_id: Uuid,
    pub state_id: Uuid,
    pub status: String,
    pub reference_no: String,
    pub allocated_at: DateTime<Utc>,
}

impl LandAllocationRow {
    pub(crate) fn into_domain(self) -> Result<LandAllocation, String> {
        let status = self
            .status
            .parse()
            .map_err(|_| format!("invalid allocation status in database: {}", self.status))?;
        Ok(LandAllocation {
            id: AllocationId::from_uuid(self.id),
            member_id: MemberId::new(self.member_id)
                .map_err(|err| format!("invalid member id in database: {err}"))?,
            unit_id: UnitId::from_uuid(self.land_parcel_unit_id),
            parcel_id: ParcelId::from_uuid(self.land_parcel_id),
            state_id: self.state_id,
            status,
            reference_no: ReferenceNumber::parse(self.reference_no)
                .map_err(|err| format!("invalid reference number in database: {err}"))?,
            allocated_at: self.allocated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = land_allocations)]
pub(crate) struct NewLandAllocationRow<'a> {
    pub id: Uuid,
    pub member_id: &'a str,
    pub land_parcel_unit_id: Uuid,
    pub land_parcel_id: Uuid,
    pub state_id: Uuid,
    pub status: &'a str,
    pub reference_no: &'a str,
    pub allocated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification outbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = allotment_notifications)]
pub(crate) struct NewNotificationRow<'a> {
    pub id: Uuid,
    pub allocation_id: Uuid,
    pub member_id: &'a str,
    pub reference_no: &'a str,
    pub status: &'a str,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
}

/// Row returned by the outbox claim statement.
#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = allotment_notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ClaimedNotificationRow {
    pub id: Uuid,
    pub allocation_id: Uuid,
    pub member_id: String,
    pub reference_no: String,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
}
