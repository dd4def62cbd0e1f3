use time::OffsetDateTime;

/// A registered device the gateway can deliver to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub owner_id: String,
    pub device_type: String,
    pub token: String,
    pub last_registered_at: OffsetDateTime,
}

/// A gateway report that `device_token` stopped accepting pushes at `invalidated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFeedback {
    pub device_token: String,
    pub invalidated_at: OffsetDateTime,
}
