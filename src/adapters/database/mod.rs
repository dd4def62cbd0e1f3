pub mod device_repo;
pub mod records;
pub mod subscription_repo;

use crate::config::DatabaseConfig;
use crate::domain::device::Device;
use crate::domain::query::Record;
use crate::domain::subscription::Subscription;
use crate::error::{AppError, Result};
use crate::services::store::{ConnectionOpener, StoreConn};
use async_trait::async_trait;
use device_repo::DeviceRepository;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use subscription_repo::SubscriptionRepository;
use time::OffsetDateTime;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `sqlx::Error` if the connection fails.
pub async fn init_pool(config: &DatabaseConfig) -> std::result::Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
}

/// Opens pooled Postgres connections for the store.
#[derive(Clone, Debug)]
pub struct PgConnectionOpener {
    pool: DbPool,
    subscriptions: SubscriptionRepository,
    devices: DeviceRepository,
}

impl PgConnectionOpener {
    #[must_use]
    pub const fn new(pool: DbPool, subscriptions: SubscriptionRepository, devices: DeviceRepository) -> Self {
        Self { pool, subscriptions, devices }
    }
}

#[async_trait]
impl ConnectionOpener for PgConnectionOpener {
    async fn open(&self) -> Result<Box<dyn StoreConn>> {
        let conn = self.pool.acquire().await.map_err(AppError::Connection)?;
        Ok(Box::new(PgStoreConn {
            conn,
            subscriptions: self.subscriptions.clone(),
            devices: self.devices.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct PgStoreConn {
    conn: PoolConnection<Postgres>,
    subscriptions: SubscriptionRepository,
    devices: DeviceRepository,
}

#[async_trait]
impl StoreConn for PgStoreConn {
    async fn get_subscription(&mut self, id: &str, owner_id: &str) -> Result<Subscription> {
        self.subscriptions.find(&mut self.conn, id, owner_id).await
    }

    async fn save_subscription(&mut self, subscription: &Subscription) -> Result<()> {
        self.subscriptions.upsert(&mut self.conn, subscription).await
    }

    async fn delete_subscription(&mut self, id: &str, owner_id: &str) -> Result<()> {
        self.subscriptions.delete(&mut self.conn, id, owner_id).await
    }

    async fn matching_subscriptions(&mut self, record: &Record) -> Result<Vec<Subscription>> {
        self.subscriptions.find_matching(&mut self.conn, record).await
    }

    async fn save_device(&mut self, device: &Device) -> Result<()> {
        self.devices.upsert(&mut self.conn, device).await
    }

    async fn get_device(&mut self, id: &str) -> Result<Device> {
        self.devices.find(&mut self.conn, id).await
    }

    async fn delete_device_by_token(&mut self, token: &str, invalidated_at: OffsetDateTime) -> Result<()> {
        let deleted = self.devices.delete_by_token(&mut self.conn, token, invalidated_at).await?;
        tracing::debug!(deleted, "Invalidated devices by token");
        Ok(())
    }
}
