use crate::domain::subscription::SubscriptionValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid subscription: {0}")]
    Validation(#[from] SubscriptionValidationError),
    #[error("Subscription not found")]
    NotFound,
    #[error("Device not found")]
    DeviceNotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to open store connection: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl AppError {
    /// Whether the error reflects a defect in stored data rather than a condition
    /// the caller can recover from.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
