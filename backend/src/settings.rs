//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `ALLOTMENT_*` environment variables, configuration files
//! and command-line flags, in OrthoConfig's usual precedence. Optional
//! fields fall back to the defaults below through accessor methods.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::land::ParcelId;
use crate::domain::{DEFAULT_TRANSACTION_TIMEOUT, NotificationDispatcherConfig};
use crate::outbound::mailer::DEFAULT_MAILER_TIMEOUT;
use crate::outbound::persistence::DEFAULT_MAX_SIZE;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised when a setting is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    #[error("invalid value for {name}='{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration values for the allotment service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ALLOTMENT")]
pub struct AllotmentSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Parcel every allocation draws from.
    pub parcel_id: Option<String>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Time budget for one allocation transaction, in milliseconds.
    pub transaction_timeout_ms: Option<u64>,
    /// Maximum pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Endpoint receiving allotment notifications. Without it the
    /// dispatcher does not start and notifications stay queued.
    pub mailer_endpoint: Option<String>,
    /// Per-request mailer timeout, in milliseconds.
    pub mailer_timeout_ms: Option<u64>,
    /// Idle wait between outbox passes, in milliseconds.
    pub outbox_poll_interval_ms: Option<u64>,
    /// Rows claimed per outbox pass.
    pub outbox_batch_size: Option<u32>,
    /// Delivery attempts before a notification is marked failed.
    pub outbox_max_attempts: Option<u32>,
    /// Apply embedded migrations at startup.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> SettingsError {
    SettingsError::Invalid {
        name,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

impl AllotmentSettings {
    /// Database URL; required.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::Missing {
                name: "database_url",
            })
    }

    /// Configured parcel; required.
    pub fn parcel_id(&self) -> Result<ParcelId, SettingsError> {
        let raw = self
            .parcel_id
            .as_deref()
            .ok_or(SettingsError::Missing { name: "parcel_id" })?;
        Uuid::parse_str(raw.trim())
            .map(ParcelId::from_uuid)
            .map_err(|err| invalid("parcel_id", raw, err))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err| invalid("bind_addr", raw, err))
    }

    pub fn transaction_timeout(&self) -> Duration {
        self.transaction_timeout_ms
            .map_or(DEFAULT_TRANSACTION_TIMEOUT, Duration::from_millis)
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_MAX_SIZE)
    }

    /// Mailer endpoint, if one is configured.
    pub fn mailer_endpoint(&self) -> Result<Option<Url>, SettingsError> {
        self.mailer_endpoint
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| Url::parse(raw.trim()).map_err(|err| invalid("mailer_endpoint", raw, err)))
            .transpose()
    }

    pub fn mailer_timeout(&self) -> Duration {
        self.mailer_timeout_ms
            .map_or(DEFAULT_MAILER_TIMEOUT, Duration::from_millis)
    }

    /// Dispatcher configuration with overrides applied.
    ///
    /// The per-send timeout tracks the mailer timeout so the dispatcher
    /// never abandons a request the client is still waiting on.
    pub fn dispatcher_config(&self) -> NotificationDispatcherConfig {
        let defaults = NotificationDispatcherConfig::default();
        NotificationDispatcherConfig {
            batch_size: self.outbox_batch_size.unwrap_or(defaults.batch_size).max(1),
            max_attempts: self
                .outbox_max_attempts
                .unwrap_or(defaults.max_attempts)
                .max(1),
            poll_interval: self
                .outbox_poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            send_timeout: self.mailer_timeout() + Duration::from_secs(1),
            ..defaults
        }
    }
}
