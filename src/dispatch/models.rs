use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// A scheduled tricycle departure as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: i64,
    /// ISO-8601 departure time; absent until a dispatcher schedules one.
    #[serde(default, alias = "scheduledTime")]
    pub scheduled_time: Option<String>,
    #[serde(default, alias = "isDispatched")]
    pub is_dispatched: bool,
    #[serde(default, alias = "passengerCount")]
    pub passenger_count: u32,
    #[serde(default, alias = "driverName")]
    pub driver_name: Option<String>,
    #[serde(default, alias = "dispatcherName")]
    pub dispatcher_name: Option<String>,
    #[serde(default, alias = "tricycleNumber")]
    pub tricycle_number: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
}

impl Dispatch {
    /// The instant the countdown should run to, if any.
    ///
    /// A dispatched record has already left, so it has no countdown.
    pub fn countdown_target(&self) -> Option<&str> {
        if self.is_dispatched {
            return None;
        }
        self.scheduled_time
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Decode a dispatch-status response body.
///
/// The endpoint answers with `null`, a single record, a list (the first
/// entry is the active one), or any of those wrapped in `{"data": ...}`.
pub fn parse_status_body(body: &str) -> Result<Option<Dispatch>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(body).map_err(ApiError::Decode)?;
    from_value(value)
}

fn from_value(value: serde_json::Value) -> Result<Option<Dispatch>, ApiError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Array(items) => match items.into_iter().next() {
            Some(first) => from_value(first),
            None => Ok(None),
        },
        serde_json::Value::Object(mut map) if !map.contains_key("id") && map.contains_key("data") => {
            let inner = map.remove("data").unwrap_or(serde_json::Value::Null);
            from_value(inner)
        }
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(ApiError::Decode),
    }
}
