use crate::adapters::database::records::DeviceRecord;
use crate::domain::device::Device;
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;

#[derive(Clone, Debug, Default)]
pub struct DeviceRepository {}

impl DeviceRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Registers a device or refreshes an existing registration.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, device), fields(id = %device.id), err)]
    pub(crate) async fn upsert(&self, conn: &mut PgConnection, device: &Device) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO _device (id, user_id, type, token, last_registered_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                type = EXCLUDED.type,
                token = EXCLUDED.token,
                last_registered_at = EXCLUDED.last_registered_at
            "#,
        )
        .bind(&device.id)
        .bind(&device.owner_id)
        .bind(&device.device_type)
        .bind(&device.token)
        .bind(device.last_registered_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::DeviceNotFound` if no device has this id.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find(&self, conn: &mut PgConnection, id: &str) -> Result<Device> {
        let record = sqlx::query_as::<_, DeviceRecord>(
            "SELECT id, user_id, type, token, last_registered_at FROM _device WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        record.map(Device::from).ok_or(AppError::DeviceNotFound)
    }

    /// Deletes devices holding `token` that were last registered before `invalidated_at`.
    /// A device that re-registered after the gateway noticed it was gone survives.
    /// Its subscriptions are removed with it by the cascading foreign key.
    ///
    /// # Errors
    /// Returns `AppError::DeviceNotFound` if no device qualified.
    #[tracing::instrument(level = "debug", skip(self, conn, token), err)]
    pub(crate) async fn delete_by_token(
        &self,
        conn: &mut PgConnection,
        token: &str,
        invalidated_at: OffsetDateTime,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM _device WHERE token = $1 AND last_registered_at < $2")
            .bind(token)
            .bind(invalidated_at)
            .execute(conn)
            .await?;

        match result.rows_affected() {
            0 => Err(AppError::DeviceNotFound),
            n => Ok(n),
        }
    }
}
