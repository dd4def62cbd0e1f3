pub mod apns;

use crate::domain::device::DeviceFeedback;
use crate::domain::push::Notification;
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway rejected notification ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    #[error("Device token is no longer registered: {reason}")]
    Unregistered { reason: String, invalidated_at: Option<OffsetDateTime> },
    #[error("Failed to sign provider token: {0}")]
    Auth(String),
    #[error("Failed to encode payload: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A notification the gateway refused after accepting it for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFailure {
    pub notification_id: Uuid,
    pub device_token: String,
    pub error: String,
}

#[async_trait]
pub trait PushGateway: Send + Sync + std::fmt::Debug {
    /// Delivers a notification, returning once the gateway has acknowledged it.
    ///
    /// # Errors
    /// Returns the gateway's rejection or a transport failure.
    async fn send(&self, notification: &Notification) -> Result<(), GatewayError>;

    /// Every delivery failure the gateway saw, including ones already returned from
    /// `send`; stays open for the gateway's lifetime.
    fn failed_notifications(&self) -> BoxStream<'static, NotificationFailure>;

    /// One finite batch of devices the gateway has found unreachable.
    fn feedback(&self) -> BoxStream<'static, DeviceFeedback>;
}
