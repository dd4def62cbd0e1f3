use crate::adapters::push::{GatewayError, NotificationFailure, PushGateway};
use crate::config::ApnsConfig;
use crate::domain::device::DeviceFeedback;
use crate::domain::push::Notification;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// APNs rejects provider tokens older than an hour and throttles refreshes under 20 minutes.
const PROVIDER_TOKEN_TTL: time::Duration = time::Duration::minutes(50);

#[derive(Serialize)]
struct ProviderClaims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    reason: String,
    /// Milliseconds since the epoch at which the token stopped being valid.
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Token-authenticated client for the APNs HTTP/2 provider API.
pub struct ApnsGateway {
    client: reqwest::Client,
    host: &'static str,
    topic: String,
    team_id: String,
    key_id: String,
    signing_key: EncodingKey,
    provider_token: Mutex<Option<(String, OffsetDateTime)>>,
    failures: broadcast::Sender<NotificationFailure>,
    unregistered: Mutex<Vec<DeviceFeedback>>,
}

impl std::fmt::Debug for ApnsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApnsGateway")
            .field("host", &self.host)
            .field("topic", &self.topic)
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl ApnsGateway {
    /// Builds a gateway from config and the contents of the `.p8` signing key.
    ///
    /// # Errors
    /// Returns `GatewayError::Auth` if the key is not a valid P-256 PKCS#8 key, or
    /// `GatewayError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ApnsConfig, signing_key_pem: &[u8]) -> Result<Self, GatewayError> {
        let signing_key = EncodingKey::from_ec_pem(signing_key_pem).map_err(|e| GatewayError::Auth(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let (failures, _) = broadcast::channel(config.failure_channel_capacity.max(1));

        Ok(Self {
            client,
            host: config.environment.host(),
            topic: config.topic.clone(),
            team_id: config.team_id.clone(),
            key_id: config.key_id.clone(),
            signing_key,
            provider_token: Mutex::new(None),
            failures,
            unregistered: Mutex::new(Vec::new()),
        })
    }

    fn provider_token(&self) -> Result<String, GatewayError> {
        let now = OffsetDateTime::now_utc();
        let mut cached =
            self.provider_token.lock().map_err(|_| GatewayError::Auth("provider token cache poisoned".into()))?;

        if let Some((token, _)) = cached.as_ref().filter(|(_, issued_at)| now - *issued_at < PROVIDER_TOKEN_TTL) {
            return Ok(token.clone());
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        let claims = ProviderClaims { iss: &self.team_id, iat: now.unix_timestamp() };
        let token = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        tracing::debug!(key_id = %self.key_id, "Issued new APNs provider token");
        *cached = Some((token.clone(), now));
        Ok(token)
    }

    /// Queues a token for the next feedback batch. A token is queued at most once,
    /// keeping its latest invalidation time.
    fn record_unregistered(&self, device_token: &str, invalidated_at: OffsetDateTime) {
        let Ok(mut pending) = self.unregistered.lock() else {
            return;
        };
        match pending.iter_mut().find(|entry| entry.device_token == device_token) {
            Some(entry) => entry.invalidated_at = entry.invalidated_at.max(invalidated_at),
            None => pending.push(DeviceFeedback { device_token: device_token.to_string(), invalidated_at }),
        }
    }
}

fn rejection(status: StatusCode, body: ErrorBody) -> GatewayError {
    if status == StatusCode::GONE {
        let invalidated_at = body
            .timestamp
            .and_then(|ms| OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok());
        GatewayError::Unregistered { reason: body.reason, invalidated_at }
    } else {
        GatewayError::Rejected { status: status.as_u16(), reason: body.reason }
    }
}

#[async_trait]
impl PushGateway for ApnsGateway {
    #[tracing::instrument(level = "debug", skip(self, notification), fields(apns_id = %notification.id), err)]
    async fn send(&self, notification: &Notification) -> Result<(), GatewayError> {
        let token = self.provider_token()?;
        let body = serde_json::to_vec(&notification.payload)?;
        let push_type = if notification.payload.is_background() { "background" } else { "alert" };

        let mut request = self
            .client
            .post(format!("{}/3/device/{}", self.host, notification.device_token))
            .bearer_auth(token)
            .header("apns-id", notification.id.to_string())
            .header("apns-topic", self.topic.as_str())
            .header("apns-push-type", push_type)
            .header("apns-priority", notification.priority.as_u8().to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(expiration) = notification.expiration {
            request = request.header("apns-expiration", expiration.unix_timestamp().to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error = rejection(status, response.json::<ErrorBody>().await.unwrap_or_default());
        if let GatewayError::Unregistered { invalidated_at, .. } = &error {
            self.record_unregistered(&notification.device_token, invalidated_at.unwrap_or_else(OffsetDateTime::now_utc));
        }

        // HTTP/2 rejections are synchronous, so every failure is both returned and
        // published. The stream is the audit trail; callers own retry decisions.
        // No subscribers is fine.
        let _ = self.failures.send(NotificationFailure {
            notification_id: notification.id,
            device_token: notification.device_token.clone(),
            error: error.to_string(),
        });

        Err(error)
    }

    fn failed_notifications(&self) -> BoxStream<'static, NotificationFailure> {
        BroadcastStream::new(self.failures.subscribe())
            .filter_map(|item| async move {
                match item {
                    Ok(failure) => Some(failure),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Failed-notification stream lagged");
                        None
                    }
                }
            })
            .boxed()
    }

    fn feedback(&self) -> BoxStream<'static, DeviceFeedback> {
        let batch = self.unregistered.lock().map(|mut pending| std::mem::take(&mut *pending)).unwrap_or_default();
        stream::iter(batch).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApnsEnvironment;
    use std::path::PathBuf;

    const TEST_KEY: &[u8] = include_bytes!("../../../tests/fixtures/apns_test_key.p8");

    fn config() -> ApnsConfig {
        ApnsConfig {
            environment: ApnsEnvironment::Sandbox,
            topic: "com.example.app".into(),
            team_id: "TEAM123".into(),
            key_id: "KEY456".into(),
            signing_key_path: PathBuf::from("unused.p8"),
            request_timeout_secs: 5,
            failure_channel_capacity: 8,
        }
    }

    #[test]
    fn test_rejects_invalid_signing_key() {
        let res = ApnsGateway::new(&config(), b"not a key");
        assert!(matches!(res, Err(GatewayError::Auth(_))));
    }

    #[test]
    fn test_provider_token_is_cached() {
        let gateway = ApnsGateway::new(&config(), TEST_KEY).expect("valid key");
        let first = gateway.provider_token().expect("token issued");
        let second = gateway.provider_token().expect("token issued");
        assert_eq!(first, second);
        assert_eq!(first.split('.').count(), 3);
    }

    #[test]
    fn test_gone_maps_to_unregistered_with_timestamp() {
        let body = ErrorBody { reason: "Unregistered".into(), timestamp: Some(1_700_000_000_000) };
        match rejection(StatusCode::GONE, body) {
            GatewayError::Unregistered { reason, invalidated_at } => {
                assert_eq!(reason, "Unregistered");
                assert_eq!(invalidated_at.map(OffsetDateTime::unix_timestamp), Some(1_700_000_000));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_other_status_maps_to_rejected() {
        let body = ErrorBody { reason: "BadDeviceToken".into(), timestamp: None };
        assert!(matches!(
            rejection(StatusCode::BAD_REQUEST, body),
            GatewayError::Rejected { status: 400, ref reason } if reason == "BadDeviceToken"
        ));
    }

    #[tokio::test]
    async fn test_feedback_drains_recorded_tokens_once() {
        let gateway = ApnsGateway::new(&config(), TEST_KEY).expect("valid key");
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp");
        gateway.record_unregistered("aaa", at);
        gateway.record_unregistered("bbb", at);

        let batch: Vec<_> = gateway.feedback().collect().await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].device_token, "aaa");

        let empty: Vec<_> = gateway.feedback().collect().await;
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_unregistered_token_is_queued_once() {
        let gateway = ApnsGateway::new(&config(), TEST_KEY).expect("valid key");
        let earlier = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp");
        let later = OffsetDateTime::from_unix_timestamp(1_700_000_500).expect("valid timestamp");
        gateway.record_unregistered("aaa", earlier);
        gateway.record_unregistered("aaa", later);
        gateway.record_unregistered("aaa", earlier);

        let batch: Vec<_> = gateway.feedback().collect().await;
        assert_eq!(batch, vec![DeviceFeedback { device_token: "aaa".into(), invalidated_at: later }]);
    }

    #[tokio::test]
    async fn test_failed_notifications_are_broadcast() {
        let gateway = ApnsGateway::new(&config(), TEST_KEY).expect("valid key");
        let mut failures = gateway.failed_notifications();
        let failure = NotificationFailure {
            notification_id: uuid::Uuid::now_v7(),
            device_token: "aaa".into(),
            error: "BadDeviceToken".into(),
        };
        gateway.failures.send(failure.clone()).expect("subscriber present");
        assert_eq!(failures.next().await, Some(failure));
    }
}
