//! Shared helper utilities for allotment integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! each suite declares `mod support;` and uses the pieces it needs.

#![allow(
    dead_code,
    reason = "each integration suite uses a different subset of the helpers"
)]

pub mod cluster;
pub mod embedded_postgres;
pub mod land_fixtures;

pub use cluster::{handle_cluster_setup_failure, shared_cluster_handle};
pub use embedded_postgres::provision_template_database;

/// Render a `postgres` error with enough detail to be useful in CI logs.
///
/// `postgres::Error`'s `Display` often collapses database errors to a bare
/// `db error`; the SQLSTATE, detail and hint come from `as_db_error()`.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}
