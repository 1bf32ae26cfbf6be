//! Provision a land parcel so the service has inventory to allocate from.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::io;

use allotment::domain::land::{LandParcel, LandParcelDraft, ParcelId};
use allotment::domain::ports::{LandParcelRepository, ParcelProvisioning};
use allotment::outbound::persistence::{
    DbPool, DieselLandParcelRepository, PoolConfig, run_pending_migrations,
};
use clap::Parser;
use tokio::runtime::Builder;
use uuid::Uuid;

const DATABASE_URL_ENV: &str = "ALLOTMENT_DATABASE_URL";

/// `provision-parcel` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "provision-parcel",
    about = "Create a land parcel with a fixed unit capacity; existing parcels are left untouched",
    version
)]
struct CliArgs {
    /// Parcel identifier. A random one is generated when omitted.
    #[arg(long = "parcel-id", value_name = "uuid")]
    parcel_id: Option<Uuid>,
    /// Human-readable parcel title.
    #[arg(long = "title", value_name = "text")]
    title: String,
    /// Land registry survey number.
    #[arg(long = "survey-number", value_name = "text")]
    survey_number: String,
    /// Postal address of the parcel.
    #[arg(long = "address-line", value_name = "text")]
    address_line: Option<String>,
    /// Administrative state the parcel belongs to.
    #[arg(long = "state-id", value_name = "uuid")]
    state_id: Uuid,
    /// Number of units the parcel can be divided into.
    #[arg(long = "units-total", value_name = "count", value_parser = clap::value_parser!(u32).range(1..))]
    units_total: u32,
    /// Apply pending migrations before provisioning.
    #[arg(long = "migrate")]
    migrate: bool,
    /// Database connection URL. Falls back to `ALLOTMENT_DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let database_url = resolve_database_url(args.database_url.clone())?;
    let parcel = parcel_from_args(&args)?;

    if args.migrate {
        let applied = run_pending_migrations(&database_url)
            .await
            .map_err(|error| io::Error::other(format!("apply migrations: {error}")))?;
        println!("migrations_applied={}", applied.len());
    }

    let pool = DbPool::new(PoolConfig::new(&database_url).with_max_size(1))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    let outcome = DieselLandParcelRepository::new(pool)
        .provision(&parcel)
        .await
        .map_err(|error| io::Error::other(format!("provision parcel: {error}")))?;

    let status = match outcome {
        ParcelProvisioning::Created => "created",
        ParcelProvisioning::AlreadyExists => "already_exists",
    };
    println!("status={status}");
    println!("parcel_id={}", parcel.id());
    println!("units_total={}", parcel.units_total());
    Ok(())
}

fn parcel_from_args(args: &CliArgs) -> io::Result<LandParcel> {
    LandParcel::new(LandParcelDraft {
        id: args.parcel_id.map_or_else(ParcelId::random, ParcelId::from_uuid),
        title: args.title.clone(),
        survey_number: args.survey_number.clone(),
        address_line: args.address_line.clone(),
        state_id: args.state_id,
        units_total: args.units_total,
        units_available: args.units_total,
    })
    .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error.to_string()))
}

fn resolve_database_url(explicit: Option<String>) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "--database-url must not be empty when provided",
            ));
        }
        return Ok(value);
    }

    let from_env = env::var(DATABASE_URL_ENV).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("database URL missing: set --database-url or {DATABASE_URL_ENV}"),
        )
    })?;
    if from_env.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{DATABASE_URL_ENV} must not be empty"),
        ));
    }
    Ok(from_env)
}
