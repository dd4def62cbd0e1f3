use crate::adapters::push::{GatewayError, PushGateway};
use crate::domain::push::{Notification, Payload, PayloadSource};
use crate::services::translator;
use crate::workers::FailureDrainWorker;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    sent: Counter<u64>,
    errors: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("pushkeeper");
        Self {
            sent: meter
                .u64_counter("push_sent_total")
                .with_description("Total number of push notifications accepted by the gateway")
                .build(),
            errors: meter
                .u64_counter("push_errors_total")
                .with_description("Total number of push notifications rejected by the gateway")
                .build(),
        }
    }
}

/// Sends notifications to single devices.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    gateway: Arc<dyn PushGateway>,
    metrics: Metrics,
}

impl Dispatcher {
    #[must_use]
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway, metrics: Metrics::new() }
    }

    /// The sink for this dispatcher's asynchronous delivery failures. Spawn it
    /// alongside the dispatcher; it must never share a task with `send`.
    #[must_use]
    pub fn failure_drain(&self) -> FailureDrainWorker {
        FailureDrainWorker::new(self.gateway.as_ref())
    }

    /// Translates `body` and sends it to `device_token` at immediate priority.
    /// A missing body sends an empty payload.
    ///
    /// # Errors
    /// Returns the gateway's error unchanged.
    #[tracing::instrument(skip(self, body), fields(notification_id = tracing::field::Empty))]
    pub async fn send(&self, body: Option<&dyn PayloadSource>, device_token: &str) -> Result<(), GatewayError> {
        let payload = body.map_or_else(Payload::default, translator::translate);
        let notification = Notification::new(device_token, payload);
        tracing::Span::current().record("notification_id", tracing::field::display(notification.id));

        match self.gateway.send(&notification).await {
            Ok(()) => {
                self.metrics.sent.add(1, &[]);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send push notification");
                let reason = if matches!(e, GatewayError::Unregistered { .. }) { "unregistered" } else { "other" };
                self.metrics.errors.add(1, &[KeyValue::new("reason", reason)]);
                Err(e)
            }
        }
    }
}
