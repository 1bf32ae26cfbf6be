//! PostgreSQL-backed `LandParcelRepository` using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::land::{LandParcel, ParcelId};
use crate::domain::ports::{LandParcelRepository, LandParcelRepositoryError, ParcelProvisioning};

use super::diesel_error_mapping::{map_basic_diesel_error, map_pool_error};
use super::models::{LandParcelRow, NewLandParcelRow};
use super::pool::DbPool;
use super::schema::land_parcels;

/// Diesel-backed implementation of [`LandParcelRepository`].
#[derive(Clone)]
pub struct DieselLandParcelRepository {
    pool: DbPool,
}

impl DieselLandParcelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: &diesel::result::Error) -> LandParcelRepositoryError {
    map_basic_diesel_error(
        error,
        LandParcelRepositoryError::query,
        LandParcelRepositoryError::connection,
    )
}

#[async_trait]
impl LandParcelRepository for DieselLandParcelRepository {
    async fn find_by_id(
        &self,
        parcel_id: ParcelId,
    ) -> Result<Option<LandParcel>, LandParcelRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LandParcelRepositoryError::connection))?;

        let row: Option<LandParcelRow> = land_parcels::table
            .find(*parcel_id.as_uuid())
            .select(LandParcelRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(&err))?;

        row.map(|row| row.into_domain().map_err(LandParcelRepositoryError::query))
            .transpose()
    }

    async fn provision(
        &self,
        parcel: &LandParcel,
    ) -> Result<ParcelProvisioning, LandParcelRepositoryError> {
        let new_row = NewLandParcelRow::from_domain(parcel).map_err(LandParcelRepositoryError::query)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LandParcelRepositoryError::connection))?;

        let inserted = diesel::insert_into(land_parcels::table)
            .values(&new_row)
            .on_conflict(land_parcels::id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        Ok(if inserted == 0 {
            ParcelProvisioning::AlreadyExists
        } else {
            ParcelProvisioning::Created
        })
    }
}
