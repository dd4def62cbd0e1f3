use crate::domain::push::{APS_KEY, Alert, Aps, Payload, PayloadSource};
use serde_json::{Map, Value};

/// A control-section value with JSON numbers folded into one integer form.
#[derive(Debug, PartialEq)]
enum ControlValue<'a> {
    Integer(i64),
    Text(&'a str),
    Map(&'a Map<String, Value>),
    Other,
}

impl<'a> From<&'a Value> for ControlValue<'a> {
    #[allow(clippy::cast_possible_truncation)]
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_i64()
                // Out-of-range values saturate, matching the float cast below.
                .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
                // Fractions truncate toward zero.
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map_or(Self::Other, Self::Integer),
            Value::String(s) => Self::Text(s),
            Value::Object(m) => Self::Map(m),
            _ => Self::Other,
        }
    }
}

/// Builds a push payload from a loosely-typed body.
///
/// The `aps` entry fills the control section field by field; values of the wrong
/// type are skipped. Every other entry is passed through as a custom field. A key
/// that cannot be set is logged and dropped without affecting the rest.
pub fn translate<S: PayloadSource + ?Sized>(source: &S) -> Payload {
    let mut payload = Payload::default();

    for (key, value) in source.payload_map() {
        if key == APS_KEY {
            match &value {
                Value::Object(aps) => apply_aps(aps, &mut payload.aps),
                other => tracing::error!(key = %key, value = %other, "Failed to set key, control section is not an object"),
            }
        } else if let Err(e) = payload.set_custom_value(key, value) {
            tracing::error!(error = %e, "Failed to set custom payload key");
        }
    }

    payload
}

fn apply_aps(fields: &Map<String, Value>, aps: &mut Aps) {
    for (key, value) in fields {
        match (key.as_str(), ControlValue::from(value)) {
            ("content-available", ControlValue::Integer(n)) => aps.content_available = n,
            ("sound", ControlValue::Text(sound)) => aps.sound = sound.to_string(),
            ("badge", ControlValue::Integer(n)) => aps.badge = Some(n),
            ("alert", ControlValue::Text(body)) => aps.alert.body = Some(body.to_string()),
            ("alert", ControlValue::Map(alert)) => match serde_json::from_value::<Alert>(Value::Object(alert.clone())) {
                Ok(alert) => aps.alert = alert,
                Err(e) => tracing::error!(error = %e, "Failed to convert alert, ignoring"),
            },
            (key, _) => tracing::debug!(key, "Ignoring control field"),
        }
    }
}
