//! Builders turning server configuration into HTTP handler state.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;

use allotment::domain::{LandAllocationService, LandAllocationServiceConfig};
use allotment::inbound::http::state::{HttpState, HttpStatePorts};
use allotment::outbound::persistence::{DieselLandAllocationRepository, DieselLandParcelRepository};

use super::config::AllocationWiring;

/// Build handler state around the database-backed allocation service.
pub(crate) fn build_http_state(wiring: &AllocationWiring) -> web::Data<HttpState> {
    let service = Arc::new(
        LandAllocationService::new(
            Arc::new(DieselLandAllocationRepository::new(
                wiring.pool.clone(),
                wiring.transaction_timeout,
            )),
            Arc::new(DieselLandParcelRepository::new(wiring.pool.clone())),
            Arc::new(DefaultClock),
            wiring.dispatch.clone(),
            LandAllocationServiceConfig::new(wiring.parcel_id)
                .with_transaction_timeout(wiring.transaction_timeout),
        )
        .with_metrics(wiring.metrics.clone()),
    );

    web::Data::new(HttpState::new(HttpStatePorts {
        allocations: service.clone(),
        allocations_query: service,
    }))
}
