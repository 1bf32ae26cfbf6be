//! Diesel table definitions for the allotment schema.
//!
//! These must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Land parcel inventory pools.
    land_parcels (id) {
        id -> Uuid,
        title -> Varchar,
        survey_number -> Varchar,
        address_line -> Nullable<Varchar>,
        state_id -> Uuid,
        /// Fixed capacity; `CHECK (units_total >= 0)`.
        units_total -> Int4,
        /// Remaining capacity; `CHECK (units_available BETWEEN 0 AND units_total)`.
        units_available -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Units carved out of a parcel. `(land_parcel_id, unit_number)` is unique.
    land_parcel_units (id) {
        id -> Uuid,
        land_parcel_id -> Uuid,
        unit_number -> Int4,
        status -> Varchar,
        locked_until -> Timestamptz,
        note -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Member allocations. `member_id`, `land_parcel_unit_id` and
    /// `reference_no` are each unique.
    land_allocations (id) {
        id -> Uuid,
        member_id -> Varchar,
        land_parcel_unit_id -> Uuid,
        land_parcel_id -> Uuid,
        state_id -> Uuid,
        status -> Varchar,
        reference_no -> Varchar,
        allocated_at -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Allotment notification outbox, one row per allocation.
    allotment_notifications (id) {
        id -> Uuid,
        allocation_id -> Uuid,
        member_id -> Varchar,
        reference_no -> Varchar,
        /// `pending`, `sent` or `failed`.
        status -> Varchar,
        attempts -> Int4,
        next_attempt_at -> Timestamptz,
        last_error -> Nullable<Varchar>,
        delivered_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(land_parcel_units -> land_parcels (land_parcel_id));
diesel::joinable!(allotment_notifications -> land_allocations (allocation_id));

diesel::allow_tables_to_appear_in_same_query!(
    land_parcels,
    land_parcel_units,
    land_allocations,
    allotment_notifications,
);
