use crate::domain::query::Query;
use crate::domain::subscription::{NotificationInfo, Subscription};
use sqlx::FromRow;
use sqlx::types::Json;

#[derive(Debug, FromRow)]
pub struct SubscriptionRecord {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) device_id: String,
    #[sqlx(rename = "type")]
    pub(crate) subscription_type: String,
    pub(crate) notification_info: Option<Json<NotificationInfo>>,
    pub(crate) query: Option<Json<Query>>,
}

impl From<SubscriptionRecord> for Subscription {
    fn from(record: SubscriptionRecord) -> Self {
        // NULL documents decode to their empty form.
        Self {
            id: record.id,
            owner_id: record.user_id,
            device_id: record.device_id,
            subscription_type: record.subscription_type,
            notification_info: record.notification_info.map(|Json(info)| info).unwrap_or_default(),
            query: record.query.map(|Json(query)| query).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::Predicate;
    use serde_json::json;

    #[test]
    fn test_null_documents_decode_to_defaults() {
        let record = SubscriptionRecord {
            id: "sub1".into(),
            user_id: "alice".into(),
            device_id: "device1".into(),
            subscription_type: "query".into(),
            notification_info: None,
            query: None,
        };
        let sub = Subscription::from(record);
        assert_eq!(sub.notification_info, NotificationInfo::default());
        assert_eq!(sub.query, Query::default());
        assert_eq!(sub.owner_id, "alice");
    }

    #[test]
    fn test_documents_carried_through() {
        let info: NotificationInfo = serde_json::from_value(json!({"apns": {"aps": {"badge": 1}}})).expect("valid");
        let query = Query::new("note").with_predicate(Predicate::eq("tag", "x"));
        let record = SubscriptionRecord {
            id: "sub1".into(),
            user_id: "alice".into(),
            device_id: "device1".into(),
            subscription_type: "query".into(),
            notification_info: Some(Json(info.clone())),
            query: Some(Json(query.clone())),
        };
        let sub = Subscription::from(record);
        assert_eq!(sub.notification_info, info);
        assert_eq!(sub.query, query);
    }
}
