#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use pushkeeper::adapters::database::device_repo::DeviceRepository;
use pushkeeper::adapters::database::subscription_repo::SubscriptionRepository;
use pushkeeper::adapters::database::{self, PgConnectionOpener};
use pushkeeper::adapters::push::PushGateway;
use pushkeeper::adapters::push::apns::ApnsGateway;
use pushkeeper::config::Config;
use pushkeeper::{App, telemetry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    let boot_span = tracing::info_span!("boot_pushkeeper");
    let app = async {
        let pool = database::init_pool(&config.database).await?;
        pushkeeper::run_migrations(&pool).await?;

        let signing_key = tokio::fs::read(&config.apns.signing_key_path).await?;
        let gateway: Arc<dyn PushGateway> = Arc::new(ApnsGateway::new(&config.apns, &signing_key)?);
        let opener = Arc::new(PgConnectionOpener::new(pool, SubscriptionRepository::new(), DeviceRepository::new()));

        tracing::info!(environment = ?config.apns.environment, topic = %config.apns.topic, "gateway configured");
        Ok::<App, anyhow::Error>(App::new(gateway, opener))
    }
    .instrument(boot_span)
    .await?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    pushkeeper::spawn_signal_handler(shutdown_tx);

    let worker_tasks = app.workers.spawn_all(shutdown_rx.clone());
    let _ = shutdown_rx.wait_for(|&s| s).await;

    tokio::select! {
        () = async {
            futures::future::join_all(worker_tasks).await;
        } => {
            tracing::info!("Background tasks finished.");
        }
        () = tokio::time::sleep(Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background tasks to finish.");
        }
    }

    telemetry_guard.shutdown();
    Ok(())
}
