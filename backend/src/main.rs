//! Allotment service entry-point: wires persistence, the notification
//! dispatcher and the HTTP server, then drives graceful shutdown.

mod server;

use std::io;
use std::sync::Arc;

use actix_web::web;
use mockable::{DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use allotment::domain::ports::AllocationMetrics;
use allotment::domain::{DispatchSignal, NotificationDispatcher, NotificationDispatcherPorts};
use allotment::inbound::http::health::HealthState;
use allotment::inbound::http::session_config::{
    BuildMode, SessionSettings, session_settings_from_env,
};
use allotment::outbound::mailer::HttpAllotmentMailer;
use allotment::outbound::persistence::{
    DbPool, DieselNotificationOutbox, PoolConfig, run_pending_migrations,
};
use allotment::settings::AllotmentSettings;

use server::{AllocationWiring, ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AllotmentSettings::load()
        .map_err(|e| io::Error::other(format!("failed to load configuration: {e}")))?;
    let session = session_settings()?;
    let bind_addr = settings.bind_addr().map_err(io::Error::other)?;
    let database_url = settings.database_url().map_err(io::Error::other)?;
    let parcel_id = settings.parcel_id().map_err(io::Error::other)?;

    if settings.run_migrations {
        let applied = run_pending_migrations(database_url)
            .await
            .map_err(io::Error::other)?;
        info!(applied = applied.len(), "database migrations applied");
    }

    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(settings.pool_max_size()))
        .await
        .map_err(io::Error::other)?;

    let dispatch = DispatchSignal::new();
    let wiring = AllocationWiring::new(
        pool.clone(),
        parcel_id,
        settings.transaction_timeout(),
        dispatch.clone(),
    );
    let (allocation_metrics, config) =
        observability(ServerConfig::new(session, bind_addr, wiring))?;

    let (stop_dispatcher, dispatcher_stopped) = oneshot::channel::<()>();
    let dispatcher = match settings.mailer_endpoint().map_err(io::Error::other)? {
        Some(endpoint) => {
            let mailer = HttpAllotmentMailer::new(endpoint, settings.mailer_timeout())
                .map_err(io::Error::other)?;
            let worker = NotificationDispatcher::new(
                NotificationDispatcherPorts::new(
                    Arc::new(DieselNotificationOutbox::new(pool.clone())),
                    Arc::new(mailer),
                    allocation_metrics,
                ),
                Arc::new(DefaultClock),
                dispatch,
                settings.dispatcher_config(),
            );
            Some(spawn_dispatcher(worker, dispatcher_stopped))
        }
        None => {
            warn!("no mailer endpoint configured; allotment notifications stay queued");
            None
        }
    };

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, %parcel_id, "allotment service listening");

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown requested; draining");
        health_state.mark_draining();
        handle.stop(true).await;
    });

    let served = server.await;

    // The receiver may already be gone when no dispatcher was started.
    let _ = stop_dispatcher.send(());
    if let Some(task) = dispatcher {
        if let Err(e) = task.await {
            warn!(error = %e, "notification dispatcher ended abnormally");
        }
    }

    served
}

fn session_settings() -> io::Result<SessionSettings> {
    session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(io::Error::other)
}

fn spawn_dispatcher(
    worker: NotificationDispatcher,
    stop: oneshot::Receiver<()>,
) -> actix_web::rt::task::JoinHandle<()> {
    actix_web::rt::spawn(async move {
        worker
            .run(async {
                let _ = stop.await;
            })
            .await;
    })
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable; listening for ctrl-c only"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed");
    }
}

#[cfg(feature = "metrics")]
fn observability(
    config: ServerConfig,
) -> io::Result<(Arc<dyn AllocationMetrics>, ServerConfig)> {
    use allotment::outbound::metrics::PrometheusAllocationMetrics;

    let registry = prometheus::Registry::new();
    let allocation = PrometheusAllocationMetrics::new(&registry).map_err(|e| {
        io::Error::other(format!("allocation metrics registration failed: {e}"))
    })?;
    let http = server::http_metrics(registry)?;
    let allocation: Arc<dyn AllocationMetrics> = Arc::new(allocation);
    let config = config
        .with_allocation_metrics(allocation.clone())
        .with_metrics(Some(http));
    Ok((allocation, config))
}

#[cfg(not(feature = "metrics"))]
fn observability(
    config: ServerConfig,
) -> io::Result<(Arc<dyn AllocationMetrics>, ServerConfig)> {
    use allotment::domain::ports::NoOpAllocationMetrics;

    Ok((Arc::new(NoOpAllocationMetrics), config))
}

#[cfg(test)]
mod tests {
    //! Start-up configuration read from the process environment.

    use std::io::Write;

    use actix_web::cookie::SameSite;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    #[rstest]
    fn session_settings_come_from_the_process_environment() {
        let mut key = NamedTempFile::new().expect("temp key file");
        key.write_all(&[b'k'; 64]).expect("write key bytes");
        let key_path = key.path().to_str().expect("utf-8 temp path").to_owned();
        let _guard = env_lock::lock_env([
            ("SESSION_KEY_FILE", Some(key_path.as_str())),
            ("SESSION_COOKIE_NAME", Some("member_session")),
            ("SESSION_COOKIE_SECURE", Some("0")),
            ("SESSION_SAMESITE", Some("Strict")),
            ("SESSION_ALLOW_EPHEMERAL", Some("0")),
        ]);

        let settings = session_settings().expect("session settings load");

        assert_eq!(settings.cookie_name, "member_session");
        assert!(!settings.cookie_secure);
        assert_eq!(settings.same_site, SameSite::Strict);
    }
}
