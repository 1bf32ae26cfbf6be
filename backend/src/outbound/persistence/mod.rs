//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the allocation, parcel and outbox ports,
//! backed by `diesel-async` connections pooled with `bb8`.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between row structs and
//!   domain types. Unit numbering and availability arithmetic stay in the
//!   domain.
//! - **Internal models**: `models.rs` and `schema.rs` never leak to the
//!   domain.
//! - **Typed errors**: Diesel failures are classified once in
//!   `diesel_error_mapping` and translated into each port's error enum.
//!
//! # Example
//!
//! ```ignore
//! use allotment::outbound::persistence::{DbPool, DieselLandParcelRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/allotment")).await?;
//! let parcels = DieselLandParcelRepository::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_land_allocation_repository;
mod diesel_land_parcel_repository;
mod diesel_notification_outbox;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_land_allocation_repository::DieselLandAllocationRepository;
pub use diesel_land_parcel_repository::DieselLandParcelRepository;
pub use diesel_notification_outbox::DieselNotificationOutbox;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_SIZE, DbPool, PoolConfig, PoolError};
