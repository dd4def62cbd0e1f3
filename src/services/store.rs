use crate::domain::device::Device;
use crate::domain::query::Record;
use crate::domain::subscription::Subscription;
use crate::error::Result;
use async_trait::async_trait;
use time::OffsetDateTime;

/// A single storage connection. Dropping it returns the connection.
#[async_trait]
pub trait StoreConn: Send + std::fmt::Debug {
    /// # Errors
    /// Returns `AppError::NotFound` if no subscription matches both keys.
    async fn get_subscription(&mut self, id: &str, owner_id: &str) -> Result<Subscription>;

    /// # Errors
    /// Returns `AppError::Validation`, `AppError::DeviceNotFound` or `AppError::Database`.
    async fn save_subscription(&mut self, subscription: &Subscription) -> Result<()>;

    /// # Errors
    /// Returns `AppError::NotFound` if nothing was deleted, `AppError::InvariantViolation`
    /// if the key matched more than one row.
    async fn delete_subscription(&mut self, id: &str, owner_id: &str) -> Result<()>;

    /// # Errors
    /// Returns `AppError::Database` if the lookup fails.
    async fn matching_subscriptions(&mut self, record: &Record) -> Result<Vec<Subscription>>;

    /// # Errors
    /// Returns `AppError::Database` if the write fails.
    async fn save_device(&mut self, device: &Device) -> Result<()>;

    /// # Errors
    /// Returns `AppError::DeviceNotFound` if no device has this id.
    async fn get_device(&mut self, id: &str) -> Result<Device>;

    /// Invalidates devices registered under `token` before `invalidated_at`.
    ///
    /// # Errors
    /// Returns `AppError::DeviceNotFound` if no device qualified.
    async fn delete_device_by_token(&mut self, token: &str, invalidated_at: OffsetDateTime) -> Result<()>;
}

/// Hands out connections, one per unit of work.
#[async_trait]
pub trait ConnectionOpener: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns `AppError::Connection` if no connection could be acquired.
    async fn open(&self) -> Result<Box<dyn StoreConn>>;
}
