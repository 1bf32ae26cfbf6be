//! Access to the shared embedded PostgreSQL cluster.
//!
//! Suites that need a database call [`shared_cluster_handle`]; when the
//! cluster cannot start and `SKIP_TEST_CLUSTER` is truthy the suite skips
//! instead of failing.

use std::any::Any;
use std::panic;
use std::time::Duration;

use pg_embedded_setup_unpriv::ClusterHandle;

const SHARED_CLUSTER_RETRIES: usize = 5;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);
const STABLE_PASSWORD: &str = "allotment_embedded_test";

/// Returns true when `SKIP_TEST_CLUSTER` is `1`, `true` or `yes`
/// (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip or fail on a cluster setup error.
///
/// Prints a skip marker and returns `None` when skipping is allowed, and
/// panics otherwise so CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Shared cluster for the whole test binary, retrying transient bootstrap
/// failures.
///
/// A bootstrap that panics (for example when the `pg_worker` helper cannot
/// be found) is reported as an error without retrying, so callers can route
/// it through [`handle_cluster_setup_failure`].
pub fn shared_cluster_handle() -> Result<&'static ClusterHandle, String> {
    ensure_stable_password();
    let mut attempt = 1;
    loop {
        let bootstrap =
            panic::catch_unwind(pg_embedded_setup_unpriv::test_support::shared_cluster_handle)
                .map_err(|payload| {
                    format!("cluster bootstrap panicked: {}", panic_message(payload.as_ref()))
                })?;
        match bootstrap {
            Ok(handle) => return Ok(handle),
            Err(error) if attempt >= SHARED_CLUSTER_RETRIES => return Err(error.to_string()),
            Err(_) => {
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Pin `PG_PASSWORD` so a reused data directory keeps accepting logins.
///
/// A fresh random password per process would not match the one `initdb`
/// recorded the first time the directory was created.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns threads; the
        // shared handle serialises bootstrap behind a mutex.
        unsafe {
            std::env::set_var("PG_PASSWORD", STABLE_PASSWORD);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("1"), true)]
    #[case(Some("YES"), true)]
    #[case(Some("true"), true)]
    #[case(Some("0"), false)]
    #[case(None, false)]
    fn skip_flag_is_parsed(#[case] value: Option<&str>, #[case] expected: bool) {
        let _guard = env_lock::lock_env([("SKIP_TEST_CLUSTER", value)]);
        assert_eq!(should_skip_test_cluster(), expected);
    }

    #[rstest]
    fn panic_messages_are_recovered_from_payloads() {
        let literal = panic::catch_unwind(|| panic!("pg_worker binary was not found"))
            .expect_err("closure panics");
        assert_eq!(panic_message(literal.as_ref()), "pg_worker binary was not found");

        let formatted = panic::catch_unwind(|| panic!("worker exited with {}", 101))
            .expect_err("closure panics");
        assert_eq!(panic_message(formatted.as_ref()), "worker exited with 101");
    }

    #[rstest]
    fn bootstrap_panic_becomes_a_skip_when_allowed() {
        let _guard = env_lock::lock_env([("SKIP_TEST_CLUSTER", Some("1"))]);
        let payload = panic::catch_unwind(|| panic!("PG_EMBEDDED_WORKER is not set"))
            .expect_err("closure panics");
        let reason = format!("cluster bootstrap panicked: {}", panic_message(payload.as_ref()));
        assert!(handle_cluster_setup_failure::<()>(reason).is_none());
    }

    #[rstest]
    fn existing_password_is_kept() {
        let _guard = env_lock::lock_env([("PG_PASSWORD", Some("custom_value"))]);
        ensure_stable_password();
        assert_eq!(
            std::env::var("PG_PASSWORD").expect("PG_PASSWORD should be set"),
            "custom_value"
        );
    }
}
