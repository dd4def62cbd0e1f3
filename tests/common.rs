#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use pushkeeper::adapters::push::{GatewayError, NotificationFailure, PushGateway};
use pushkeeper::domain::device::{Device, DeviceFeedback};
use pushkeeper::domain::push::Notification;
use pushkeeper::domain::query::Record;
use pushkeeper::domain::subscription::Subscription;
use pushkeeper::error::{AppError, Result};
use pushkeeper::services::store::{ConnectionOpener, StoreConn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("pushkeeper=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// In-process gateway that records sends and serves scripted feedback.
#[derive(Debug)]
pub struct MockGateway {
    pub sent: Mutex<Vec<Notification>>,
    pub reject: bool,
    pub feedback_calls: AtomicUsize,
    feedback: Mutex<Vec<DeviceFeedback>>,
    failures: broadcast::Sender<NotificationFailure>,
}

impl MockGateway {
    pub fn new() -> Self {
        let (failures, _) = broadcast::channel(16);
        Self {
            sent: Mutex::new(Vec::new()),
            reject: false,
            feedback_calls: AtomicUsize::new(0),
            feedback: Mutex::new(Vec::new()),
            failures,
        }
    }

    pub fn rejecting() -> Self {
        Self { reject: true, ..Self::new() }
    }

    pub fn with_feedback(entries: Vec<DeviceFeedback>) -> Self {
        let gateway = Self::new();
        *gateway.feedback.lock().unwrap() = entries;
        gateway
    }

    pub fn report_failure(&self, failure: NotificationFailure) -> usize {
        self.failures.send(failure).unwrap_or(0)
    }

    pub fn feedback_calls(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushGateway for MockGateway {
    async fn send(&self, notification: &Notification) -> std::result::Result<(), GatewayError> {
        if self.reject {
            return Err(GatewayError::Rejected { status: 400, reason: "BadDeviceToken".into() });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn failed_notifications(&self) -> BoxStream<'static, NotificationFailure> {
        BroadcastStream::new(self.failures.subscribe()).filter_map(|item| async move { item.ok() }).boxed()
    }

    fn feedback(&self) -> BoxStream<'static, DeviceFeedback> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        let batch = std::mem::take(&mut *self.feedback.lock().unwrap());
        stream::iter(batch).boxed()
    }
}

pub fn feedback(token: &str, unix: i64) -> DeviceFeedback {
    DeviceFeedback {
        device_token: token.to_string(),
        invalidated_at: OffsetDateTime::from_unix_timestamp(unix).unwrap(),
    }
}

/// Store double that records device invalidations.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    pub invalidations: Arc<Mutex<Vec<(String, OffsetDateTime)>>>,
    pub failing_tokens: HashSet<String>,
    pub fail_open: bool,
    pub opened: AtomicUsize,
}

impl RecordingOpener {
    pub fn failing_for(tokens: &[&str]) -> Self {
        Self { failing_tokens: tokens.iter().map(ToString::to_string).collect(), ..Self::default() }
    }

    pub fn unavailable() -> Self {
        Self { fail_open: true, ..Self::default() }
    }

    pub fn invalidations(&self) -> Vec<(String, OffsetDateTime)> {
        self.invalidations.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionOpener for RecordingOpener {
    async fn open(&self) -> Result<Box<dyn StoreConn>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(AppError::Connection(sqlx::Error::PoolTimedOut));
        }
        Ok(Box::new(RecordingConn {
            invalidations: Arc::clone(&self.invalidations),
            failing_tokens: self.failing_tokens.clone(),
        }))
    }
}

#[derive(Debug)]
struct RecordingConn {
    invalidations: Arc<Mutex<Vec<(String, OffsetDateTime)>>>,
    failing_tokens: HashSet<String>,
}

#[async_trait]
impl StoreConn for RecordingConn {
    async fn get_subscription(&mut self, _id: &str, _owner_id: &str) -> Result<Subscription> {
        Err(AppError::NotFound)
    }

    async fn save_subscription(&mut self, _subscription: &Subscription) -> Result<()> {
        Ok(())
    }

    async fn delete_subscription(&mut self, _id: &str, _owner_id: &str) -> Result<()> {
        Err(AppError::NotFound)
    }

    async fn matching_subscriptions(&mut self, _record: &Record) -> Result<Vec<Subscription>> {
        Ok(Vec::new())
    }

    async fn save_device(&mut self, _device: &Device) -> Result<()> {
        Ok(())
    }

    async fn get_device(&mut self, _id: &str) -> Result<Device> {
        Err(AppError::DeviceNotFound)
    }

    async fn delete_device_by_token(&mut self, token: &str, invalidated_at: OffsetDateTime) -> Result<()> {
        self.invalidations.lock().unwrap().push((token.to_string(), invalidated_at));
        if self.failing_tokens.contains(token) {
            return Err(AppError::DeviceNotFound);
        }
        Ok(())
    }
}
