//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the land allocation and health endpoints, the error
//! envelope and the session cookie scheme. Swagger UI serves it in debug
//! builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::land::{AllocationStatus, NotificationState};
use crate::domain::{Error, ErrorCode};
use crate::inbound::http::land_allocation::AllocationResponseBody;

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Member session cookie issued by the identity provider; carries `member_id`.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Allotment API",
        description = "Allocate land units to authenticated members and read allocations back."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::land_allocation::allocate_land,
        crate::inbound::http::land_allocation::get_land_allocation,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        AllocationResponseBody,
        AllocationStatus,
        NotificationState,
        Error,
        ErrorCode
    )),
    tags(
        (name = "land-allocation", description = "Allocate land units to members"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
