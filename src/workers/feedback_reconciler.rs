use crate::adapters::push::PushGateway;
use crate::error::Result;
use crate::services::store::ConnectionOpener;
use futures::StreamExt;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::watch;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    passes: Counter<u64>,
    invalidated: Counter<u64>,
    invalidation_errors: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("pushkeeper");
        Self {
            passes: meter
                .u64_counter("feedback_passes_total")
                .with_description("Total number of feedback passes, by outcome")
                .build(),
            invalidated: meter
                .u64_counter("feedback_devices_invalidated_total")
                .with_description("Total number of device registrations invalidated from gateway feedback")
                .build(),
            invalidation_errors: meter
                .u64_counter("feedback_invalidation_errors_total")
                .with_description("Total number of feedback entries that could not be applied")
                .build(),
        }
    }
}

/// Outcome of one drain of the feedback stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub received: usize,
    pub invalidated: usize,
    pub failed: usize,
}

/// The first UTC midnight strictly after `now`.
#[must_use]
pub fn next_run_at(now: OffsetDateTime) -> OffsetDateTime {
    let now = now.to_offset(UtcOffset::UTC);
    now.date().next_day().map_or(now + time::Duration::DAY, |day| day.midnight().assume_utc())
}

/// Applies gateway feedback to device registrations: once at startup, then daily at 00:00 UTC.
#[derive(Debug)]
pub struct FeedbackReconciler {
    gateway: Arc<dyn PushGateway>,
    opener: Arc<dyn ConnectionOpener>,
    metrics: Metrics,
}

impl FeedbackReconciler {
    #[must_use]
    pub fn new(gateway: Arc<dyn PushGateway>, opener: Arc<dyn ConnectionOpener>) -> Self {
        Self { gateway, opener, metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.run_pass().await;

        while !*shutdown.borrow() {
            // Recomputed from the wall clock every time so the schedule never drifts.
            let now = OffsetDateTime::now_utc();
            let next_run = next_run_at(now);
            let delay = (next_run - now).unsigned_abs();
            tracing::info!(delay_secs = delay.as_secs(), next_run = %next_run, "Next feedback pass scheduled");

            tokio::select! {
                () = tokio::time::sleep(delay) => self.run_pass().await,
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("Feedback reconciler shutting down...");
    }

    async fn run_pass(&self) {
        match self.reconcile().instrument(tracing::info_span!("feedback_pass")).await {
            Ok(report) => {
                self.metrics.passes.add(1, &[KeyValue::new("outcome", "completed")]);
                tracing::info!(
                    received = report.received,
                    invalidated = report.invalidated,
                    failed = report.failed,
                    "Feedback pass finished"
                );
            }
            Err(e) => {
                self.metrics.passes.add(1, &[KeyValue::new("outcome", "aborted")]);
                tracing::error!(error = %e, "Failed to open store connection, aborting feedback pass");
            }
        }
    }

    /// Drains one feedback batch into the store. Individual invalidation failures
    /// are logged and do not stop the pass.
    ///
    /// # Errors
    /// Returns `AppError::Connection` if no connection could be opened; the
    /// feedback stream is left untouched in that case.
    pub async fn reconcile(&self) -> Result<PassReport> {
        let mut conn = self.opener.open().await?;
        let mut report = PassReport::default();

        tracing::info!("Querying feedback service");
        let mut feedback = self.gateway.feedback();
        while let Some(entry) = feedback.next().await {
            report.received += 1;
            tracing::info!(device_token = %entry.device_token, invalidated_at = %entry.invalidated_at, "Got feedback");

            match conn.delete_device_by_token(&entry.device_token, entry.invalidated_at).await {
                Ok(()) => {
                    report.invalidated += 1;
                    self.metrics.invalidated.add(1, &[]);
                }
                Err(e) => {
                    report.failed += 1;
                    self.metrics.invalidation_errors.add(1, &[]);
                    tracing::error!(error = %e, device_token = %entry.device_token, "Failed to delete device token");
                }
            }
        }

        if report.received == 0 {
            tracing::info!("No feedback received");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_next_run_is_following_midnight() {
        assert_eq!(next_run_at(datetime!(2026-10-16 13:45:10 UTC)), datetime!(2026-10-17 00:00 UTC));
    }

    #[test]
    fn test_next_run_at_exact_midnight_is_a_day_later() {
        assert_eq!(next_run_at(datetime!(2026-10-16 00:00 UTC)), datetime!(2026-10-17 00:00 UTC));
    }

    #[test]
    fn test_next_run_crosses_month_and_year() {
        assert_eq!(next_run_at(datetime!(2026-12-31 23:59:59.999 UTC)), datetime!(2027-01-01 00:00 UTC));
        assert_eq!(next_run_at(datetime!(2028-02-28 12:00 UTC)), datetime!(2028-02-29 00:00 UTC));
    }

    #[test]
    fn test_next_run_uses_utc_date_for_offset_times() {
        // 23:30 at +02:00 is already 21:30 UTC of the same day.
        assert_eq!(next_run_at(datetime!(2026-10-16 23:30 +2)), datetime!(2026-10-17 00:00 UTC));
        // 01:00 at +03:00 is 22:00 UTC of the previous day.
        assert_eq!(next_run_at(datetime!(2026-10-17 01:00 +3)), datetime!(2026-10-17 00:00 UTC));
    }

    #[test]
    fn test_next_run_is_within_a_day() {
        let now = OffsetDateTime::now_utc();
        let next = next_run_at(now);
        assert!(next > now);
        assert!(next - now <= time::Duration::DAY);
    }
}
