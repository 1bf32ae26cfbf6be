//! Queue a member's allotment notification for another delivery attempt.
//!
//! Resets the outbox row to pending with a fresh attempt budget; the running
//! service's dispatcher picks it up on its next pass.

use std::env;

use allotment::domain::land::MemberId;
use allotment::domain::ports::NotificationOutbox;
use allotment::outbound::persistence::{DbPool, DieselNotificationOutbox, PoolConfig};
use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use tokio::runtime::Builder;

const DATABASE_URL_ENV: &str = "ALLOTMENT_DATABASE_URL";

/// `resend-notification` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "resend-notification",
    about = "Requeue the allotment notification for one member",
    version
)]
struct CliArgs {
    /// Member whose allotment notification should be sent again.
    #[arg(long = "member-id", value_name = "id")]
    member_id: String,
    /// Database connection URL. Falls back to `ALLOTMENT_DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let member_id = MemberId::new(args.member_id).wrap_err("invalid member id")?;
    let database_url = match args.database_url {
        Some(url) if !url.trim().is_empty() => url,
        Some(_) => return Err(eyre!("--database-url must not be empty when provided")),
        None => env::var(DATABASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| eyre!("database URL missing: set --database-url or {DATABASE_URL_ENV}"))?,
    };

    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(1))
        .await
        .wrap_err("failed to create database pool")?;
    let requeued = DieselNotificationOutbox::new(pool)
        .requeue_for_member(&member_id, Utc::now())
        .await
        .wrap_err_with(|| format!("failed to requeue notification for {member_id}"))?;

    if !requeued {
        return Err(eyre!("no allotment notification exists for member {member_id}"));
    }
    println!("requeued member_id={member_id}");
    Ok(())
}
