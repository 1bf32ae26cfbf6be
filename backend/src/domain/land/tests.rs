//! Unit coverage for land domain types.

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;

fn draft_with(units_total: u32, units_available: u32) -> LandParcelDraft {
    LandParcelDraft {
        id: ParcelId::random(),
        title: "North Block".to_owned(),
        survey_number: "SY-101".to_owned(),
        address_line: Some("Plot 4, Ring Road".to_owned()),
        state_id: Uuid::new_v4(),
        units_total,
        units_available,
    }
}

#[fixture]
fn fresh_parcel() -> LandParcel {
    LandParcel::new(draft_with(10, 10)).expect("valid parcel")
}

#[fixture]
fn member() -> MemberId {
    MemberId::new("member-1").expect("valid member id")
}

#[rstest]
#[case("", LandValidationError::EmptyMemberId)]
#[case(" member", LandValidationError::MemberIdWhitespace)]
#[case("member\n", LandValidationError::MemberIdWhitespace)]
fn member_id_rejects_malformed_values(#[case] raw: &str, #[case] expected: LandValidationError) {
    assert_eq!(MemberId::new(raw), Err(expected));
}

#[rstest]
fn member_id_enforces_length_limit() {
    let at_limit = "m".repeat(MemberId::MAX_LEN);
    assert!(MemberId::new(at_limit).is_ok());

    let too_long = "m".repeat(MemberId::MAX_LEN + 1);
    assert_eq!(
        MemberId::new(too_long),
        Err(LandValidationError::MemberIdTooLong {
            max: MemberId::MAX_LEN
        })
    );
}

#[rstest]
fn member_id_deserialisation_validates() {
    let parsed: Result<MemberId, _> = serde_json::from_str("\"  \"");
    assert!(parsed.is_err());
}

#[rstest]
fn parcel_rejects_availability_above_total() {
    let err = LandParcel::new(draft_with(3, 4)).expect_err("availability above total");
    assert_eq!(
        err,
        LandValidationError::AvailabilityExceedsTotal {
            available: 4,
            total: 3
        }
    );
}

#[rstest]
fn parcel_rejects_blank_title() {
    let mut draft = draft_with(1, 1);
    draft.title = "  ".to_owned();
    assert_eq!(
        LandParcel::new(draft),
        Err(LandValidationError::BlankParcelTitle)
    );
}

#[rstest]
fn parcel_drops_blank_address_line() {
    let mut draft = draft_with(1, 1);
    draft.address_line = Some(" ".to_owned());
    let parcel = LandParcel::new(draft).expect("valid parcel");
    assert!(parcel.address_line().is_none());
}

#[rstest]
fn claims_number_units_sequentially_until_exhausted(mut fresh_parcel: LandParcel) {
    let numbers: Vec<u32> = (0..10)
        .map(|_| fresh_parcel.claim_unit().expect("capacity remains").unit_number())
        .collect();

    assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
    assert_eq!(fresh_parcel.units_available(), 0);
    assert_eq!(fresh_parcel.units_allotted(), 10);
    assert_eq!(
        fresh_parcel.claim_unit(),
        Err(LandValidationError::ParcelExhausted)
    );
    assert_eq!(fresh_parcel.units_available(), 0);
}

#[rstest]
fn claim_continues_from_partially_allotted_parcel() {
    let mut parcel = LandParcel::new(draft_with(10, 4)).expect("valid parcel");
    let claim = parcel.claim_unit().expect("capacity remains");
    assert_eq!(claim.unit_number(), 7);
    assert_eq!(claim.units_available_after(), 3);
}

#[rstest]
fn zero_capacity_parcel_is_exhausted() {
    let mut parcel = LandParcel::new(draft_with(0, 0)).expect("valid parcel");
    assert_eq!(parcel.claim_unit(), Err(LandValidationError::ParcelExhausted));
}

#[rstest]
fn reference_numbers_are_prefixed_upper_hex() {
    let uuid = Uuid::parse_str("0123abcd-0000-4000-8000-00000000beef").expect("uuid");
    let reference = ReferenceNumber::from_uuid(uuid);
    assert_eq!(reference.as_ref(), "LA-0123ABCD00004000800000000000BEEF");
    assert_eq!(ReferenceNumber::parse(reference.to_string()), Ok(reference));
}

#[rstest]
#[case("LA-123")]
#[case("XX-0123ABCD00004000800000000000BEEF")]
#[case("LA-0123abcd00004000800000000000beef")]
fn reference_number_parse_rejects_malformed(#[case] raw: &str) {
    assert_eq!(
        ReferenceNumber::parse(raw),
        Err(LandValidationError::InvalidReferenceNumber)
    );
}

#[rstest]
fn generated_reference_numbers_differ() {
    assert_ne!(ReferenceNumber::generate(), ReferenceNumber::generate());
}

#[rstest]
fn lock_term_is_five_years(member: MemberId) {
    let allocated_at = Utc
        .with_ymd_and_hms(2025, 6, 15, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    let draft = AllocationDraft::new(member, allocated_at).expect("lock term in range");
    let expected = Utc
        .with_ymd_and_hms(2030, 6, 15, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    assert_eq!(draft.locked_until(), expected);
}

#[rstest]
fn lock_term_clamps_leap_day(member: MemberId) {
    let allocated_at = Utc
        .with_ymd_and_hms(2028, 2, 29, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    let draft = AllocationDraft::new(member, allocated_at).expect("lock term in range");
    let expected = Utc
        .with_ymd_and_hms(2033, 2, 28, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    assert_eq!(draft.locked_until(), expected);
}

#[rstest]
fn realise_builds_confirmed_allocation(mut fresh_parcel: LandParcel, member: MemberId) {
    let draft = AllocationDraft::new(member.clone(), Utc::now()).expect("draft");
    let claim = fresh_parcel.claim_unit().expect("capacity remains");
    let expected_reference = draft.reference_no().clone();

    let allocated = draft.clone().realise(fresh_parcel.clone(), claim);

    assert_eq!(allocated.unit.unit_number, 1);
    assert_eq!(allocated.unit.status, LandUnitStatus::Allotted);
    assert_eq!(allocated.unit.note, DIRECT_ALLOCATION_NOTE);
    assert_eq!(allocated.unit.id, draft.unit_id());
    assert_eq!(allocated.allocation.unit_id, allocated.unit.id);
    assert_eq!(allocated.allocation.member_id, member);
    assert_eq!(allocated.allocation.status, AllocationStatus::Confirmed);
    assert_eq!(allocated.allocation.state_id, fresh_parcel.state_id());
    assert_eq!(allocated.allocation.reference_no, expected_reference);
    assert_eq!(allocated.parcel.units_available(), 9);
}

#[rstest]
#[case(LandUnitStatus::Available)]
#[case(LandUnitStatus::Allotted)]
#[case(LandUnitStatus::Locked)]
fn unit_status_parses_its_storage_form(#[case] status: LandUnitStatus) {
    assert_eq!(status.as_str().parse::<LandUnitStatus>(), Ok(status));
}

#[rstest]
#[case(AllocationStatus::Pending)]
#[case(AllocationStatus::Confirmed)]
#[case(AllocationStatus::Cancelled)]
#[case(AllocationStatus::Revoked)]
fn allocation_status_parses_its_storage_form(#[case] status: AllocationStatus) {
    assert_eq!(status.as_str().parse::<AllocationStatus>(), Ok(status));
}

#[rstest]
fn statuses_reject_upper_case_legacy_values() {
    assert!("ALLOTTED".parse::<LandUnitStatus>().is_err());
    assert!("CONFIRMED".parse::<AllocationStatus>().is_err());
}
