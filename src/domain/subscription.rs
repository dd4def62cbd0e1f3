use crate::domain::push::PayloadSource;
use crate::domain::query::Query;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// What to deliver when a subscription fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationInfo {
    /// APNs body, including the optional `aps` control section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apns: Option<Map<String, Value>>,
}

impl PayloadSource for NotificationInfo {
    fn payload_map(&self) -> Map<String, Value> {
        self.apns.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub owner_id: String,
    pub device_id: String,
    #[serde(rename = "type")]
    pub subscription_type: String,
    #[serde(default)]
    pub notification_info: NotificationInfo,
    #[serde(default)]
    pub query: Query,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionValidationError {
    #[error("empty id")]
    EmptyId,
    #[error("empty type")]
    EmptyType,
    #[error("empty query type")]
    EmptyQueryType,
    #[error("empty device id")]
    EmptyDeviceId,
}

impl Subscription {
    /// Checks the fields a subscription cannot be stored without.
    ///
    /// # Errors
    /// Returns the first missing field, checked in the order id, type, query type, device id.
    pub fn validate(&self) -> Result<(), SubscriptionValidationError> {
        if self.id.is_empty() {
            return Err(SubscriptionValidationError::EmptyId);
        }
        if self.subscription_type.is_empty() {
            return Err(SubscriptionValidationError::EmptyType);
        }
        if self.query.record_type.is_empty() {
            return Err(SubscriptionValidationError::EmptyQueryType);
        }
        if self.device_id.is_empty() {
            return Err(SubscriptionValidationError::EmptyDeviceId);
        }
        Ok(())
    }
}
