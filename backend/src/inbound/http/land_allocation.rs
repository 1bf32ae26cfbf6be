//! Land allocation HTTP handlers.
//!
//! ```text
//! POST /api/v1/land-allocation
//! GET /api/v1/land-allocation
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::land::{
    AllocatedLand, AllocationRecord, AllocationStatus, NotificationState,
};
use crate::domain::ports::{AllocateLandRequest, AllocateLandResponse, GetAllocationRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Allocation confirmation returned to the member.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponseBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub member_id: String,
    #[schema(example = "LA-0123ABCD00004000800000000000BEEF")]
    pub reference_no: String,
    pub status: AllocationStatus,
    #[schema(format = "uuid")]
    pub unit_id: String,
    pub unit_number: u32,
    #[schema(format = "date-time")]
    pub locked_until: String,
    #[schema(format = "uuid")]
    pub parcel_id: String,
    pub parcel_title: String,
    pub survey_number: String,
    pub address_line: Option<String>,
    #[schema(format = "uuid")]
    pub state_id: String,
    #[schema(format = "date-time")]
    pub allocated_at: String,
    pub notification: NotificationState,
}

impl AllocationResponseBody {
    fn from_parts(land: AllocatedLand, notification: NotificationState) -> Self {
        let AllocatedLand {
            allocation,
            unit,
            parcel,
        } = land;
        Self {
            id: allocation.id.to_string(),
            member_id: allocation.member_id.to_string(),
            reference_no: allocation.reference_no.to_string(),
            status: allocation.status,
            unit_id: unit.id.to_string(),
            unit_number: unit.unit_number,
            locked_until: unit.locked_until.to_rfc3339(),
            parcel_id: parcel.id().to_string(),
            parcel_title: parcel.title().to_owned(),
            survey_number: parcel.survey_number().to_owned(),
            address_line: parcel.address_line().map(str::to_owned),
            state_id: allocation.state_id.to_string(),
            allocated_at: allocation.allocated_at.to_rfc3339(),
            notification,
        }
    }
}

impl From<AllocateLandResponse> for AllocationResponseBody {
    fn from(value: AllocateLandResponse) -> Self {
        Self::from_parts(value.allocation, value.notification)
    }
}

impl From<AllocationRecord> for AllocationResponseBody {
    fn from(value: AllocationRecord) -> Self {
        Self::from_parts(value.land, value.notification)
    }
}

/// Allocate one land unit to the authenticated member.
///
/// The request carries no body; the member comes from the session. A `201`
/// means the unit is reserved and the allotment notification is queued.
#[utoipa::path(
    post,
    path = "/api/v1/land-allocation",
    responses(
        (status = 201, description = "Land allocated", body = AllocationResponseBody),
        (status = 400, description = "Already allocated or no units available", body = Error),
        (status = 401, description = "No member session", body = Error),
        (status = 404, description = "Configured parcel not found", body = Error),
        (status = 409, description = "Concurrent allocation conflict; retry", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Storage unavailable or timed out", body = Error)
    ),
    tags = ["land-allocation"],
    operation_id = "allocateLand",
    security(("SessionCookie" = []))
)]
#[post("/land-allocation")]
pub async fn allocate_land(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let member_id = session.require_member_id()?;
    let response = state
        .allocations
        .allocate_land(AllocateLandRequest { member_id })
        .await?;
    Ok(HttpResponse::Created().json(AllocationResponseBody::from(response)))
}

/// Return the authenticated member's allocation.
#[utoipa::path(
    get,
    path = "/api/v1/land-allocation",
    responses(
        (status = 200, description = "Current allocation", body = AllocationResponseBody),
        (status = 401, description = "No member session", body = Error),
        (status = 404, description = "Member holds no allocation", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["land-allocation"],
    operation_id = "getLandAllocation",
    security(("SessionCookie" = []))
)]
#[get("/land-allocation")]
pub async fn get_land_allocation(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<AllocationResponseBody>> {
    let member_id = session.require_member_id()?;
    let record = state
        .allocations_query
        .get_allocation(GetAllocationRequest { member_id })
        .await?;
    Ok(web::Json(record.into()))
}

#[cfg(test)]
#[path = "land_allocation_tests.rs"]
mod tests;
