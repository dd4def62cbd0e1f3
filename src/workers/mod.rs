pub mod failure_drain;
pub mod feedback_reconciler;

pub use failure_drain::FailureDrainWorker;
pub use feedback_reconciler::{FeedbackReconciler, PassReport};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Background tasks owned by the process.
#[derive(Debug)]
pub struct Workers {
    pub failure_drain: FailureDrainWorker,
    pub feedback: FeedbackReconciler,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.failure_drain.run(shutdown.clone()).instrument(tracing::info_span!("failure_drain"))),
            tokio::spawn(self.feedback.run(shutdown).instrument(tracing::info_span!("feedback_reconciler"))),
        ]
    }
}
