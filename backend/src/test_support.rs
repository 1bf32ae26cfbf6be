//! Test utilities for the allotment crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or when the
//! `test-support` feature is enabled.

pub mod clock {
    //! Deterministic time sources for dispatcher and service tests.

    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Local, TimeDelta, Utc};
    use mockable::Clock;

    use crate::domain::notification_dispatcher::BackoffJitter;

    /// Clock whose current time only moves when a test advances it.
    pub struct MutableClock(Mutex<DateTime<Utc>>);

    impl MutableClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        pub fn advance(&self, delta: Duration) {
            let delta = match TimeDelta::from_std(delta) {
                Ok(delta) => delta,
                Err(error) => {
                    panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
                }
            };
            *self.lock_clock() += delta;
        }

        fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
            match self.0.lock() {
                Ok(guard) => guard,
                Err(_) => panic!("clock mutex"),
            }
        }
    }

    impl Clock for MutableClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.lock_clock()
        }
    }

    /// Jitter strategy returning the base delay untouched.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NoJitter;

    impl BackoffJitter for NoJitter {
        fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
            base
        }
    }
}

pub mod openapi {
    //! OpenAPI schema traversal helpers.

    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::{Object, Schema};

    /// Extract an `Object` schema, panicking with a diagnostic if not an Object.
    pub fn unwrap_object_schema<'a>(schema: &'a RefOr<Schema>, name: &str) -> &'a Object {
        match schema {
            RefOr::T(Schema::Object(obj)) => obj,
            RefOr::Ref(reference) => {
                panic!(
                    "schema '{name}' is a $ref to '{}'; resolve the reference first",
                    reference.ref_location
                );
            }
            _ => panic!("schema '{name}' is not an Object"),
        }
    }
}
