//! Tests for the land allocation service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::Value;
use uuid::Uuid;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::land::{
    AllocationStatus, LandParcel, LandParcelDraft, LandUnitStatus, UnitClaim,
};
use crate::domain::ports::{
    LandAllocationRepositoryError, LandParcelRepositoryError, MockAllocationMetrics,
    MockLandAllocationRepository, MockLandParcelRepository,
};
use crate::test_support::clock::MutableClock;

fn parcel_id() -> ParcelId {
    ParcelId::from_uuid(Uuid::from_u128(0x5eed))
}

fn parcel(total: u32, available: u32) -> LandParcel {
    LandParcel::new(LandParcelDraft {
        id: parcel_id(),
        title: "Riverside".to_owned(),
        survey_number: "SV-12".to_owned(),
        address_line: Some("1 River Road".to_owned()),
        state_id: Uuid::from_u128(7),
        units_total: total,
        units_available: available,
    })
    .expect("valid parcel")
}

fn member() -> MemberId {
    MemberId::new("member-1").expect("valid member id")
}

fn detail_code(error: &Error) -> Option<String> {
    error
        .details()
        .and_then(|details| details.get("code"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Repository double that runs the real claim arithmetic against a parcel.
fn claiming_repo(mut stored: LandParcel) -> MockLandAllocationRepository {
    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member().returning(|_| Ok(None));
    repo.expect_allocate().times(1).returning(move |_, draft| {
        let claim: UnitClaim = stored
            .claim_unit()
            .map_err(|_| LandAllocationRepositoryError::parcel_exhausted(stored.id()))?;
        Ok(draft.realise(stored.clone(), claim))
    });
    repo
}

fn parcels_with(found: Option<LandParcel>) -> MockLandParcelRepository {
    let mut parcels = MockLandParcelRepository::new();
    parcels
        .expect_find_by_id()
        .returning(move |_| Ok(found.clone()));
    parcels
}

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    ))
}

fn service(
    repo: MockLandAllocationRepository,
    parcels: MockLandParcelRepository,
    clock: Arc<MutableClock>,
    signal: DispatchSignal,
) -> LandAllocationService<MockLandAllocationRepository, MockLandParcelRepository> {
    LandAllocationService::new(
        Arc::new(repo),
        Arc::new(parcels),
        clock,
        signal,
        LandAllocationServiceConfig::new(parcel_id()),
    )
}

#[rstest]
#[tokio::test]
async fn allocates_first_unit_of_fresh_parcel(clock: Arc<MutableClock>) {
    let service = service(
        claiming_repo(parcel(10, 10)),
        parcels_with(Some(parcel(10, 10))),
        clock,
        DispatchSignal::new(),
    );

    let response = service
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect("allocation succeeds");

    assert_eq!(response.notification, NotificationState::Queued);
    let land = response.allocation;
    assert_eq!(land.unit.unit_number, 1);
    assert_eq!(land.unit.status, LandUnitStatus::Allotted);
    assert_eq!(land.allocation.status, AllocationStatus::Confirmed);
    assert_eq!(land.allocation.member_id, member());
    assert_eq!(land.allocation.unit_id, land.unit.id);
    assert_eq!(land.parcel.units_available(), 9);
    assert_eq!(
        land.unit.locked_until,
        Utc.with_ymd_and_hms(2031, 1, 15, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    );
}

#[rstest]
#[tokio::test]
async fn successful_allocation_wakes_dispatcher(clock: Arc<MutableClock>) {
    let signal = DispatchSignal::new();
    let service = service(
        claiming_repo(parcel(10, 10)),
        parcels_with(Some(parcel(10, 10))),
        clock,
        signal.clone(),
    );

    service
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect("allocation succeeds");

    tokio::time::timeout(Duration::from_secs(1), signal.woken())
        .await
        .expect("dispatcher was signalled");
}

#[rstest]
#[tokio::test]
async fn existing_allocation_is_refused_without_touching_inventory(
    clock: Arc<MutableClock>,
) {
    let mut existing_parcel = parcel(10, 10);
    let claim = existing_parcel.claim_unit().expect("unit available");
    let existing = AllocationDraft::new(member(), clock.utc())
        .expect("draft")
        .realise(existing_parcel, claim);

    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member().times(1).returning(move |_| {
        Ok(Some(AllocationRecord {
            land: existing.clone(),
            notification: NotificationState::Sent,
        }))
    });
    repo.expect_allocate().never();
    let mut parcels = MockLandParcelRepository::new();
    parcels.expect_find_by_id().never();

    let error = service(repo, parcels, clock, DispatchSignal::new())
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect_err("second allocation refused");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(detail_code(&error).as_deref(), Some("already_allocated"));
}

#[rstest]
#[tokio::test]
async fn missing_parcel_is_not_found(clock: Arc<MutableClock>) {
    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member().returning(|_| Ok(None));
    repo.expect_allocate().never();

    let error = service(repo, parcels_with(None), clock, DispatchSignal::new())
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect_err("parcel missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(detail_code(&error).as_deref(), Some("parcel_not_found"));
}

#[rstest]
#[tokio::test]
async fn exhausted_parcel_reports_no_units(clock: Arc<MutableClock>) {
    let service = service(
        claiming_repo(parcel(10, 0)),
        parcels_with(Some(parcel(10, 0))),
        clock,
        DispatchSignal::new(),
    );

    let error = service
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect_err("no units left");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(detail_code(&error).as_deref(), Some("no_units_available"));
}

#[rstest]
#[case(
    LandAllocationRepositoryError::member_already_allocated("member-1"),
    ErrorCode::InvalidRequest,
    Some("already_allocated")
)]
#[case(
    LandAllocationRepositoryError::conflict("could not serialize access"),
    ErrorCode::Conflict,
    Some("transaction_conflict")
)]
#[case(
    LandAllocationRepositoryError::timeout("canceling statement due to lock timeout"),
    ErrorCode::ServiceUnavailable,
    Some("transaction_timeout")
)]
#[case(
    LandAllocationRepositoryError::connection("pool exhausted"),
    ErrorCode::ServiceUnavailable,
    Some("storage_unavailable")
)]
#[case(
    LandAllocationRepositoryError::query("relation missing"),
    ErrorCode::InternalError,
    None
)]
#[tokio::test]
async fn transaction_failures_map_to_transport_errors(
    clock: Arc<MutableClock>,
    #[case] failure: LandAllocationRepositoryError,
    #[case] code: ErrorCode,
    #[case] detail: Option<&str>,
) {
    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member().returning(|_| Ok(None));
    repo.expect_allocate()
        .times(1)
        .return_once(move |_, _| Err(failure));

    let error = service(
        repo,
        parcels_with(Some(parcel(10, 10))),
        clock,
        DispatchSignal::new(),
    )
    .allocate_land(AllocateLandRequest { member_id: member() })
    .await
    .expect_err("transaction fails");

    assert_eq!(error.code(), code);
    assert_eq!(detail_code(&error).as_deref(), detail);
}

#[rstest]
#[tokio::test]
async fn parcel_lookup_outage_is_unavailable(clock: Arc<MutableClock>) {
    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member().returning(|_| Ok(None));
    let mut parcels = MockLandParcelRepository::new();
    parcels
        .expect_find_by_id()
        .returning(|_| Err(LandParcelRepositoryError::connection("refused")));

    let error = service(repo, parcels, clock, DispatchSignal::new())
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect_err("lookup fails");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert!(!error.message().contains("refused"), "{}", error.message());
}

struct StalledRepository;

#[async_trait]
impl LandAllocationRepository for StalledRepository {
    async fn find_by_member(
        &self,
        _member_id: &MemberId,
    ) -> Result<Option<AllocationRecord>, LandAllocationRepositoryError> {
        Ok(None)
    }

    async fn allocate(
        &self,
        _parcel_id: ParcelId,
        _draft: AllocationDraft,
    ) -> Result<crate::domain::land::AllocatedLand, LandAllocationRepositoryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(LandAllocationRepositoryError::query("unreachable"))
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_transaction_times_out(clock: Arc<MutableClock>) {
    let service = LandAllocationService::new(
        Arc::new(StalledRepository),
        Arc::new(parcels_with(Some(parcel(10, 10)))),
        clock,
        DispatchSignal::new(),
        LandAllocationServiceConfig::new(parcel_id())
            .with_transaction_timeout(Duration::from_millis(250)),
    );

    let error = service
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect_err("transaction times out");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(detail_code(&error).as_deref(), Some("transaction_timeout"));
}

#[rstest]
#[tokio::test]
async fn records_outcome_metrics(clock: Arc<MutableClock>) {
    let mut metrics = MockAllocationMetrics::new();
    metrics
        .expect_record_allocation()
        .withf(|outcome| *outcome == AllocationOutcome::NoUnitsAvailable)
        .times(1)
        .returning(|_| Ok(()));

    let service = service(
        claiming_repo(parcel(3, 0)),
        parcels_with(Some(parcel(3, 0))),
        clock,
        DispatchSignal::new(),
    )
    .with_metrics(Arc::new(metrics));

    let _ = service
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await;
}

#[rstest]
#[tokio::test]
async fn metric_failures_do_not_fail_allocation(clock: Arc<MutableClock>) {
    let mut metrics = MockAllocationMetrics::new();
    metrics.expect_record_allocation().returning(|_| {
        Err(crate::domain::ports::AllocationMetricsError::export("registry gone"))
    });

    let service = service(
        claiming_repo(parcel(10, 10)),
        parcels_with(Some(parcel(10, 10))),
        clock,
        DispatchSignal::new(),
    )
    .with_metrics(Arc::new(metrics));

    service
        .allocate_land(AllocateLandRequest { member_id: member() })
        .await
        .expect("allocation still succeeds");
}

#[rstest]
#[tokio::test]
async fn get_allocation_returns_record(clock: Arc<MutableClock>) {
    let mut stored = parcel(10, 10);
    let claim = stored.claim_unit().expect("unit available");
    let land = AllocationDraft::new(member(), clock.utc())
        .expect("draft")
        .realise(stored, claim);
    let expected = AllocationRecord {
        land,
        notification: NotificationState::Queued,
    };
    let returned = expected.clone();

    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member()
        .times(1)
        .return_once(move |_| Ok(Some(returned)));

    let record = service(repo, MockLandParcelRepository::new(), clock, DispatchSignal::new())
        .get_allocation(GetAllocationRequest { member_id: member() })
        .await
        .expect("allocation found");

    assert_eq!(record, expected);
}

#[rstest]
#[tokio::test]
async fn get_allocation_without_record_is_not_found(clock: Arc<MutableClock>) {
    let mut repo = MockLandAllocationRepository::new();
    repo.expect_find_by_member().returning(|_| Ok(None));

    let error = service(repo, MockLandParcelRepository::new(), clock, DispatchSignal::new())
        .get_allocation(GetAllocationRequest { member_id: member() })
        .await
        .expect_err("nothing allocated");

    assert_eq!(error.code(), ErrorCode::NotFound);
}
