use crate::adapters::push::{NotificationFailure, PushGateway};
use futures::StreamExt;
use futures::stream::BoxStream;
use opentelemetry::{global, metrics::Counter};
use tokio::sync::watch;

#[derive(Clone, Debug)]
struct Metrics {
    failed: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("pushkeeper");
        Self {
            failed: meter
                .u64_counter("push_failed_notifications_total")
                .with_description("Total number of asynchronous delivery failures reported by the gateway")
                .build(),
        }
    }
}

/// Logs every asynchronous delivery failure until the gateway closes the stream.
pub struct FailureDrainWorker {
    failures: BoxStream<'static, NotificationFailure>,
    metrics: Metrics,
}

impl std::fmt::Debug for FailureDrainWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureDrainWorker").finish_non_exhaustive()
    }
}

impl FailureDrainWorker {
    /// Subscribes to the gateway's failure stream immediately, so nothing reported
    /// after construction is missed.
    #[must_use]
    pub fn new(gateway: &dyn PushGateway) -> Self {
        Self { failures: gateway.failed_notifications(), metrics: Metrics::new() }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            tokio::select! {
                next = self.failures.next() => {
                    let Some(failure) = next else {
                        tracing::info!("Failed-notification stream closed");
                        break;
                    };
                    tracing::error!(
                        notification_id = %failure.notification_id,
                        device_token = %failure.device_token,
                        error = %failure.error,
                        "Failed to send notification"
                    );
                    self.metrics.failed.add(1, &[]);
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("Failure drain shutting down...");
    }
}
