//! Port for reading and provisioning land parcels.

use async_trait::async_trait;

use crate::domain::land::{LandParcel, ParcelId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by land parcel repository adapters.
    pub enum LandParcelRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "land parcel repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "land parcel repository query failed: {message}",
    }
}

/// Result of provisioning a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParcelProvisioning {
    /// A new parcel row was written.
    Created,
    /// A parcel with the same id already existed and was left untouched.
    AlreadyExists,
}

/// Port for land parcel lookups and out-of-band provisioning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LandParcelRepository: Send + Sync {
    /// Load a parcel without locking it.
    async fn find_by_id(
        &self,
        parcel_id: ParcelId,
    ) -> Result<Option<LandParcel>, LandParcelRepositoryError>;

    /// Insert a parcel unless one with the same id exists.
    ///
    /// Existing parcels are never modified; inventory only changes through
    /// allocation.
    async fn provision(
        &self,
        parcel: &LandParcel,
    ) -> Result<ParcelProvisioning, LandParcelRepositoryError>;
}
