//! Helper process that `pg_embedded_setup_unpriv` launches to drive the
//! embedded PostgreSQL lifecycle when the database test suites run as root.
//!
//! Invoked as `pg_worker <setup|start|stop> <payload.json>`, where the
//! payload is a serialised [`pg_embedded_setup_unpriv::worker::WorkerPayload`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Report, Result};
use pg_embedded_setup_unpriv::worker::WorkerPayload;
use postgresql_embedded::PostgreSQL;
use tokio::runtime::Builder;

/// `pg_worker` command arguments.
#[derive(Debug, Parser)]
#[command(name = "pg_worker", about = "Run one embedded PostgreSQL lifecycle step")]
struct WorkerArgs {
    /// Lifecycle step to run.
    #[arg(value_enum)]
    step: Step,
    /// Worker payload describing the cluster settings and environment.
    #[arg(value_name = "payload")]
    payload: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Step {
    Setup,
    Start,
    Stop,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = WorkerArgs::parse();
    let payload = read_payload(&args.payload)?;
    run_step(args.step, payload)
}

fn read_payload(path: &Path) -> Result<WorkerPayload> {
    let raw = fs::read(path)
        .wrap_err_with(|| format!("failed to read worker payload at {}", path.display()))?;
    serde_json::from_slice(&raw)
        .wrap_err_with(|| format!("failed to parse worker payload at {}", path.display()))
}

fn run_step(step: Step, payload: WorkerPayload) -> Result<()> {
    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| Report::new(err).wrap_err("failed to rebuild PostgreSQL settings"))?;
    for (key, value) in payload.environment {
        // SAFETY: still single-threaded; the runtime is built below.
        unsafe {
            match value {
                Some(value) => env::set_var(&key, value.expose()),
                None => env::remove_var(&key),
            }
        }
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build worker runtime")?;
    let mut postgres = PostgreSQL::new(settings);
    runtime
        .block_on(async move {
            match step {
                Step::Setup => postgres.setup().await,
                Step::Start => postgres.start().await,
                Step::Stop => postgres.stop().await,
            }
        })
        .wrap_err_with(|| format!("PostgreSQL {step:?} step failed"))
}

#[cfg(test)]
mod tests {
    //! Unit tests for worker argument handling.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("setup", Step::Setup)]
    #[case("start", Step::Start)]
    #[case("stop", Step::Stop)]
    fn lifecycle_steps_parse(#[case] raw: &str, #[case] expected: Step) {
        let args = WorkerArgs::try_parse_from(["pg_worker", raw, "/tmp/payload.json"])
            .expect("arguments parse");
        assert_eq!(args.step, expected);
        assert_eq!(args.payload, PathBuf::from("/tmp/payload.json"));
    }

    #[rstest]
    fn unknown_step_is_rejected() {
        assert!(WorkerArgs::try_parse_from(["pg_worker", "restart", "/tmp/payload.json"]).is_err());
    }

    #[rstest]
    fn extra_arguments_are_rejected() {
        assert!(
            WorkerArgs::try_parse_from(["pg_worker", "setup", "/tmp/payload.json", "extra"])
                .is_err()
        );
    }

    #[rstest]
    fn missing_payload_file_is_reported() {
        let error = read_payload(Path::new("/nonexistent/allotment/payload.json"))
            .expect_err("file does not exist");
        assert!(error.to_string().contains("failed to read worker payload"));
    }
}
