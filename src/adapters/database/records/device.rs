use crate::domain::device::Device;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, FromRow)]
pub struct DeviceRecord {
    pub(crate) id: String,
    pub(crate) user_id: String,
    #[sqlx(rename = "type")]
    pub(crate) device_type: String,
    pub(crate) token: String,
    pub(crate) last_registered_at: OffsetDateTime,
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.user_id,
            device_type: record.device_type,
            token: record.token,
            last_registered_at: record.last_registered_at,
        }
    }
}
