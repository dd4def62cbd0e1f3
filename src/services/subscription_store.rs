use crate::domain::device::Device;
use crate::domain::query::Record;
use crate::domain::subscription::Subscription;
use crate::error::Result;
use crate::services::store::ConnectionOpener;
use std::sync::Arc;
use time::OffsetDateTime;

/// Per-user subscription records and the devices they point at.
#[derive(Clone, Debug)]
pub struct SubscriptionStore {
    opener: Arc<dyn ConnectionOpener>,
}

impl SubscriptionStore {
    #[must_use]
    pub fn new(opener: Arc<dyn ConnectionOpener>) -> Self {
        Self { opener }
    }

    /// # Errors
    /// Returns `AppError::NotFound` if `owner_id` has no subscription `id`.
    pub async fn get(&self, id: &str, owner_id: &str) -> Result<Subscription> {
        let mut conn = self.opener.open().await?;
        conn.get_subscription(id, owner_id).await
    }

    /// Inserts or fully replaces a subscription.
    ///
    /// # Errors
    /// Returns `AppError::Validation` without opening a connection if a required field is empty.
    /// Returns `AppError::DeviceNotFound` if the device is not registered.
    #[tracing::instrument(skip(self, subscription), fields(id = %subscription.id, owner_id = %subscription.owner_id), err)]
    pub async fn save(&self, subscription: &Subscription) -> Result<()> {
        subscription.validate()?;
        let mut conn = self.opener.open().await?;
        conn.save_subscription(subscription).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if there was nothing to delete.
    /// Returns `AppError::InvariantViolation` if the key was not unique; treat it as a defect.
    #[tracing::instrument(skip(self), err)]
    pub async fn delete(&self, id: &str, owner_id: &str) -> Result<()> {
        let mut conn = self.opener.open().await?;
        conn.delete_subscription(id, owner_id).await
    }

    /// Subscriptions whose query matches `record`, recomputed on every call.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn find_matching_subscriptions(&self, record: &Record) -> Result<Vec<Subscription>> {
        let mut conn = self.opener.open().await?;
        conn.matching_subscriptions(record).await
    }

    /// # Errors
    /// Returns `AppError::Database` if the write fails.
    #[tracing::instrument(skip(self, device), fields(id = %device.id), err)]
    pub async fn register_device(&self, device: &Device) -> Result<()> {
        let mut conn = self.opener.open().await?;
        conn.save_device(device).await
    }

    /// # Errors
    /// Returns `AppError::DeviceNotFound` if no device has this id.
    pub async fn device(&self, id: &str) -> Result<Device> {
        let mut conn = self.opener.open().await?;
        conn.get_device(id).await
    }

    /// # Errors
    /// Returns `AppError::DeviceNotFound` if no device was registered under `token` before `invalidated_at`.
    pub async fn invalidate_device(&self, token: &str, invalidated_at: OffsetDateTime) -> Result<()> {
        let mut conn = self.opener.open().await?;
        conn.delete_device_by_token(token, invalidated_at).await
    }
}
