//! Domain primitives, services and ports.
//!
//! Purpose: define the land allocation model, the services that drive it
//! and the ports adapters implement. Nothing in here knows about HTTP or
//! Diesel.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - AllocationError — why an allocation attempt did not succeed.
//! - LandAllocationService — allocation command and query service.
//! - NotificationDispatcher — outbox worker for allotment notifications.

pub mod allocation_error;
pub mod error;
pub mod land;
pub mod land_allocation_service;
pub mod notification_dispatcher;
pub mod ports;
pub mod trace_id;

pub use self::allocation_error::AllocationError;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::land_allocation_service::{
    DEFAULT_TRANSACTION_TIMEOUT, LandAllocationService, LandAllocationServiceConfig,
};
pub use self::notification_dispatcher::{
    DispatchSignal, NotificationDispatcher, NotificationDispatcherConfig,
    NotificationDispatcherPorts,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use allotment::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("no member session"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
