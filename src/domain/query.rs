use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A data record that subscriptions are matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub owner_id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Record {
    /// Resolves a field by key. `_id` and `_owner_id` address the record's
    /// identity; everything else is looked up in `data`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "_id" => Some(Value::String(self.id.clone())),
            "_owner_id" => Some(Value::String(self.owner_id.clone())),
            _ => self.data.get(key).cloned(),
        }
    }
}

/// The matching predicate stored with a subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Predicate>,
}

impl Query {
    #[must_use]
    pub fn new(record_type: impl Into<String>) -> Self {
        Self { record_type: record_type.into(), predicate: None }
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// A query without a predicate matches every record of its type.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        if self.record_type != record.record_type {
            return false;
        }
        self.predicate.as_ref().is_none_or(|p| p.evaluate(record))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { key: String, value: Value },
    Ne { key: String, value: Value },
    Gt { key: String, value: Value },
    Gte { key: String, value: Value },
    Lt { key: String, value: Value },
    Lte { key: String, value: Value },
    In { key: String, values: Vec<Value> },
    And { predicates: Vec<Predicate> },
    Or { predicates: Vec<Predicate> },
    Not { predicate: Box<Predicate> },
}

impl Predicate {
    #[must_use]
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq { key: key.into(), value: value.into() }
    }

    #[must_use]
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Self::Eq { key, value } => record.field(key).is_some_and(|f| values_equal(&f, value)),
            Self::Ne { key, value } => !record.field(key).is_some_and(|f| values_equal(&f, value)),
            Self::Gt { key, value } => compare_field(record, key, value) == Some(Ordering::Greater),
            Self::Gte { key, value } => {
                matches!(compare_field(record, key, value), Some(Ordering::Greater | Ordering::Equal))
            }
            Self::Lt { key, value } => compare_field(record, key, value) == Some(Ordering::Less),
            Self::Lte { key, value } => {
                matches!(compare_field(record, key, value), Some(Ordering::Less | Ordering::Equal))
            }
            Self::In { key, values } => {
                record.field(key).is_some_and(|f| values.iter().any(|v| values_equal(&f, v)))
            }
            Self::And { predicates } => predicates.iter().all(|p| p.evaluate(record)),
            Self::Or { predicates } => predicates.iter().any(|p| p.evaluate(record)),
            Self::Not { predicate } => !predicate.evaluate(record),
        }
    }
}

// 1 and 1.0 are the same number once they've been through JSON.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_field(record: &Record, key: &str, value: &Value) -> Option<Ordering> {
    let field = record.field(key)?;
    match (&field, value) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(data: Value) -> Record {
        Record {
            id: "note1".into(),
            record_type: "note".into(),
            owner_id: "alice".into(),
            data: data.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_query_without_predicate_matches_type_only() {
        let query = Query::new("note");
        assert!(query.matches(&note(json!({}))));
        assert!(!Query::new("photo").matches(&note(json!({}))));
    }

    #[test]
    fn test_eq_treats_integer_and_float_alike() {
        let query = Query::new("note").with_predicate(Predicate::eq("priority", 1));
        assert!(query.matches(&note(json!({"priority": 1.0}))));
        assert!(!query.matches(&note(json!({"priority": 2}))));
    }

    #[test]
    fn test_ne_matches_missing_field() {
        let p = Predicate::Ne { key: "tag".into(), value: json!("x") };
        assert!(p.evaluate(&note(json!({}))));
        assert!(!p.evaluate(&note(json!({"tag": "x"}))));
    }

    #[test]
    fn test_ordering_comparisons() {
        let record = note(json!({"score": 10, "title": "m"}));
        assert!(Predicate::Gt { key: "score".into(), value: json!(5) }.evaluate(&record));
        assert!(Predicate::Gte { key: "score".into(), value: json!(10) }.evaluate(&record));
        assert!(!Predicate::Lt { key: "score".into(), value: json!(10) }.evaluate(&record));
        assert!(Predicate::Lte { key: "title".into(), value: json!("z") }.evaluate(&record));
        // Mixed types never compare.
        assert!(!Predicate::Gt { key: "title".into(), value: json!(1) }.evaluate(&record));
    }

    #[test]
    fn test_connectives_and_identity_fields() {
        let record = note(json!({"score": 3}));
        let p = Predicate::And {
            predicates: vec![
                Predicate::eq("_owner_id", "alice"),
                Predicate::Or {
                    predicates: vec![
                        Predicate::eq("score", 99),
                        Predicate::In { key: "score".into(), values: vec![json!(1), json!(3)] },
                    ],
                },
                Predicate::Not { predicate: Box::new(Predicate::eq("_id", "other")) },
            ],
        };
        assert!(p.evaluate(&record));
    }

    #[test]
    fn test_query_json_shape() {
        let query = Query::new("note").with_predicate(Predicate::eq("tag", "urgent"));
        let encoded = serde_json::to_value(&query).expect("serializable");
        assert_eq!(
            encoded,
            json!({"type": "note", "predicate": {"op": "eq", "key": "tag", "value": "urgent"}})
        );
        let decoded: Query = serde_json::from_value(encoded).expect("deserializable");
        assert_eq!(decoded, query);
    }
}
