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

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use adapters::database::DbPool;
use adapters::push::PushGateway;
use services::dispatcher::Dispatcher;
use services::store::ConnectionOpener;
use services::subscription_store::SubscriptionStore;
use std::sync::Arc;
use tokio::sync::watch;
use workers::{FeedbackReconciler, Workers};

/// The wired components: the store and dispatcher for callers, the workers for the runtime.
#[derive(Debug)]
pub struct App {
    pub store: SubscriptionStore,
    pub dispatcher: Dispatcher,
    pub workers: Workers,
}

impl App {
    #[must_use]
    pub fn new(gateway: Arc<dyn PushGateway>, opener: Arc<dyn ConnectionOpener>) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&gateway));
        let workers = Workers {
            failure_drain: dispatcher.failure_drain(),
            feedback: FeedbackReconciler::new(gateway, Arc::clone(&opener)),
        };
        Self { store: SubscriptionStore::new(opener), dispatcher, workers }
    }
}

/// Applies pending schema migrations.
///
/// # Errors
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}
