//! Database context, seeding and inspection helpers for allocation suites.

use std::thread;
use std::time::{Duration, Instant};

use allotment::domain::land::ParcelId;
use allotment::outbound::persistence::{DbPool, PoolConfig};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use tokio::runtime::Runtime;
use uuid::Uuid;

use super::{format_postgres_error, provision_template_database, shared_cluster_handle};

/// A migrated temporary database with a pool and a runtime to drive it.
pub struct TestDatabase {
    pub runtime: Runtime,
    pub pool: DbPool,
    pub url: String,
    _database: TemporaryDatabase,
}

impl TestDatabase {
    /// Clone the template and open a pool of `max_size` connections.
    pub fn provision(max_size: u32) -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| err.to_string())?;
        let cluster = shared_cluster_handle()?;
        let database = provision_template_database(cluster)?;
        let url = database.url().to_string();

        let config = PoolConfig::new(url.as_str())
            .with_max_size(max_size)
            .with_min_idle(Some(1));
        let pool = runtime
            .block_on(async { DbPool::new(config).await })
            .map_err(|err| err.to_string())?;

        Ok(Self {
            runtime,
            pool,
            url,
            _database: database,
        })
    }

    pub fn client(&self) -> Result<Client, String> {
        Client::connect(self.url.as_str(), NoTls).map_err(|err| format_postgres_error(&err))
    }

    /// Insert a parcel with full availability and return its id.
    pub fn seed_parcel(&self, units_total: i32) -> Result<ParcelId, String> {
        let id = Uuid::new_v4();
        let state_id = Uuid::new_v4();
        self.client()?
            .execute(
                concat!(
                    "INSERT INTO land_parcels ",
                    "(id, title, survey_number, address_line, state_id, units_total, units_available) ",
                    "VALUES ($1, 'North Block', 'SY-101', '12 Orchard Lane', $2, $3, $3)"
                ),
                &[&id, &state_id, &units_total],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(ParcelId::from_uuid(id))
    }

    /// `(units_total, units_available)` for a parcel.
    pub fn parcel_counts(&self, parcel_id: ParcelId) -> Result<(i32, i32), String> {
        let row = self
            .client()?
            .query_one(
                "SELECT units_total, units_available FROM land_parcels WHERE id = $1",
                &[parcel_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok((row.get(0), row.get(1)))
    }

    /// Unit numbers carved from a parcel, ascending.
    pub fn unit_numbers(&self, parcel_id: ParcelId) -> Result<Vec<i32>, String> {
        let rows = self
            .client()?
            .query(
                "SELECT unit_number FROM land_parcel_units WHERE land_parcel_id = $1 ORDER BY unit_number",
                &[parcel_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    /// Number of allocations held against a parcel.
    pub fn allocation_count(&self, parcel_id: ParcelId) -> Result<i64, String> {
        let row = self
            .client()?
            .query_one(
                "SELECT COUNT(*) FROM land_allocations WHERE land_parcel_id = $1",
                &[parcel_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    /// Number of allocations without a matching unit, or units without an
    /// allocation. Always zero when every transaction was atomic.
    pub fn orphan_count(&self) -> Result<i64, String> {
        let row = self
            .client()?
            .query_one(
                concat!(
                    "SELECT ",
                    "(SELECT COUNT(*) FROM land_parcel_units u ",
                    " WHERE NOT EXISTS (SELECT 1 FROM land_allocations a WHERE a.land_parcel_unit_id = u.id)) + ",
                    "(SELECT COUNT(*) FROM land_allocations a ",
                    " WHERE NOT EXISTS (SELECT 1 FROM allotment_notifications n WHERE n.allocation_id = a.id))"
                ),
                &[],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    /// `(status, attempts)` of the member's outbox row, if one exists.
    pub fn outbox_row(&self, member_id: &str) -> Result<Option<(String, i32)>, String> {
        let row = self
            .client()?
            .query_opt(
                "SELECT status, attempts FROM allotment_notifications WHERE member_id = $1",
                &[&member_id],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.map(|row| (row.get(0), row.get(1))))
    }

    /// Allocations held by one member across all parcels.
    pub fn member_allocation_count(&self, member_id: &str) -> Result<i64, String> {
        let row = self
            .client()?
            .query_one(
                "SELECT COUNT(*) FROM land_allocations WHERE member_id = $1",
                &[&member_id],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    /// Remove the one-allocation-per-member constraint so only the service
    /// pre-check guards against double allocation.
    pub fn drop_member_unique_constraint(&self) -> Result<(), String> {
        self.client()?
            .batch_execute(
                "ALTER TABLE land_allocations DROP CONSTRAINT land_allocations_member_id_key",
            )
            .map_err(|err| format_postgres_error(&err))
    }

    /// Lock the parcel row from a separate session until the returned guard
    /// is released, so allocation transactions queue behind it.
    pub fn hold_parcel_lock(&self, parcel_id: ParcelId) -> Result<ParcelLock, String> {
        let mut client = self.client()?;
        client
            .batch_execute("BEGIN")
            .map_err(|err| format_postgres_error(&err))?;
        client
            .query_one(
                "SELECT id FROM land_parcels WHERE id = $1 FOR UPDATE",
                &[parcel_id.as_uuid()],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(ParcelLock { client })
    }

    /// Poll until at least `expected` sessions are blocked on a row lock.
    pub fn wait_for_lock_waiters(&self, expected: i64, within: Duration) -> Result<(), String> {
        let mut client = self.client()?;
        let deadline = Instant::now() + within;
        loop {
            let row = client
                .query_one(
                    concat!(
                        "SELECT COUNT(*) FROM pg_stat_activity ",
                        "WHERE datname = current_database() AND wait_event_type = 'Lock'"
                    ),
                    &[],
                )
                .map_err(|err| format_postgres_error(&err))?;
            let waiting: i64 = row.get(0);
            if waiting >= expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(format!(
                    "only {waiting} of {expected} sessions waiting on the parcel lock"
                ));
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    /// Make every insert into `table` fail inside the allocation
    /// transaction.
    pub fn install_failing_trigger(&self, table: &str) -> Result<(), String> {
        let escaped = table.replace('"', "\"\"");
        let sql = format!(
            concat!(
                "CREATE OR REPLACE FUNCTION reject_insert() RETURNS trigger AS $$ ",
                "BEGIN RAISE EXCEPTION 'injected failure on %', TG_TABLE_NAME; END; ",
                "$$ LANGUAGE plpgsql; ",
                "CREATE TRIGGER reject_insert BEFORE INSERT ON \"{table}\" ",
                "FOR EACH ROW EXECUTE FUNCTION reject_insert();"
            ),
            table = escaped
        );
        self.client()?
            .batch_execute(sql.as_str())
            .map_err(|err| format_postgres_error(&err))
    }
}

/// An open transaction holding `FOR UPDATE` on one parcel row.
pub struct ParcelLock {
    client: Client,
}

impl ParcelLock {
    /// Commit the holding transaction and let queued allocations proceed.
    pub fn release(mut self) -> Result<(), String> {
        self.client
            .batch_execute("COMMIT")
            .map_err(|err| format_postgres_error(&err))
    }
}
