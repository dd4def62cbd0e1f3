use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Key of the control section inside a notification body.
pub const APS_KEY: &str = "aps";

/// Anything that can hand over a notification body as a loosely-typed map.
pub trait PayloadSource: Send + Sync {
    fn payload_map(&self) -> Map<String, Value>;
}

impl PayloadSource for Map<String, Value> {
    fn payload_map(&self) -> Map<String, Value> {
        self.clone()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Key '{0}' is reserved for the control section")]
    ReservedKey(String),
}

/// Structured alert. Serializes as a bare string when only the body is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Alert {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub title_loc_key: Option<String>,
    #[serde(default)]
    pub title_loc_args: Option<Vec<String>>,
    #[serde(default)]
    pub action_loc_key: Option<String>,
    #[serde(default)]
    pub loc_key: Option<String>,
    #[serde(default)]
    pub loc_args: Option<Vec<String>>,
    #[serde(default)]
    pub launch_image: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct AlertFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitle: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title_loc_key: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title_loc_args: &'a Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_loc_key: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loc_key: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loc_args: &'a Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    launch_image: &'a Option<String>,
}

impl Alert {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn is_body_only(&self) -> bool {
        self.body.is_some() && Self { body: None, ..self.clone() }.is_empty()
    }
}

impl Serialize for Alert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let (true, Some(body)) = (self.is_body_only(), &self.body) {
            return serializer.serialize_str(body);
        }
        AlertFields {
            title: &self.title,
            subtitle: &self.subtitle,
            body: &self.body,
            title_loc_key: &self.title_loc_key,
            title_loc_args: &self.title_loc_args,
            action_loc_key: &self.action_loc_key,
            loc_key: &self.loc_key,
            loc_args: &self.loc_args,
            launch_image: &self.launch_image,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aps {
    #[serde(skip_serializing_if = "Alert::is_empty")]
    pub alert: Alert,
    /// `Some(0)` clears the badge; `None` leaves it untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sound: String,
    #[serde(rename = "content-available", skip_serializing_if = "is_zero")]
    pub content_available: i64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// The JSON body delivered to the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    pub aps: Aps,
    #[serde(flatten)]
    custom: Map<String, Value>,
}

impl Payload {
    /// Sets a provider-specific field next to the control section.
    ///
    /// # Errors
    /// Returns `PayloadError::ReservedKey` when `key` would shadow the control section.
    pub fn set_custom_value(&mut self, key: impl Into<String>, value: Value) -> Result<(), PayloadError> {
        let key = key.into();
        if key == APS_KEY {
            return Err(PayloadError::ReservedKey(key));
        }
        self.custom.insert(key, value);
        Ok(())
    }

    #[must_use]
    pub fn custom_value(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }

    #[must_use]
    pub const fn custom(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Background pushes carry no alert, sound or badge.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.aps.content_available != 0 && self.aps.alert.is_empty() && self.aps.sound.is_empty() && self.aps.badge.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    #[default]
    Immediate,
    PowerSaving,
}

impl Priority {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Immediate => 10,
            Self::PowerSaving => 5,
        }
    }
}

/// A payload addressed to one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub device_token: String,
    pub payload: Payload,
    pub priority: Priority,
    pub expiration: Option<OffsetDateTime>,
}

impl Notification {
    #[must_use]
    pub fn new(device_token: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::now_v7(),
            device_token: device_token.into(),
            payload,
            priority: Priority::Immediate,
            expiration: None,
        }
    }
}
