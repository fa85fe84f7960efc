use serde::{Deserialize, Serialize};

/// Named events pushed by the realtime services.
///
/// Events carry no state the client trusts; they only signal that the
/// dispatch status should be fetched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    DispatchUpdated,
    DispatchFinalized,
    Other(String),
}

impl RealtimeEvent {
    pub fn parse(name: &str) -> Self {
        match name {
            "DispatchUpdated" => RealtimeEvent::DispatchUpdated,
            "DispatchFinalized" => RealtimeEvent::DispatchFinalized,
            other => RealtimeEvent::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RealtimeEvent::DispatchUpdated => "DispatchUpdated",
            RealtimeEvent::DispatchFinalized => "DispatchFinalized",
            RealtimeEvent::Other(name) => name,
        }
    }

    /// Whether this event means the dispatch status is stale.
    pub fn triggers_refresh(&self) -> bool {
        matches!(
            self,
            RealtimeEvent::DispatchUpdated | RealtimeEvent::DispatchFinalized
        )
    }
}

impl std::fmt::Display for RealtimeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Wire frames ──────────────────────────────────────────────────────

/// Server → client frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(channel: &str, event: &RealtimeEvent) -> Self {
        Self {
            channel: channel.to_string(),
            event: event.name().to_string(),
            data: serde_json::Value::Null,
        }
    }

    pub fn to_event(&self) -> RealtimeEvent {
        RealtimeEvent::parse(&self.event)
    }
}

/// Client → server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "channel", rename_all = "lowercase")]
pub enum ControlFrame {
    Subscribe(String),
    Unsubscribe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_events() {
        assert_eq!(
            RealtimeEvent::parse("DispatchUpdated"),
            RealtimeEvent::DispatchUpdated
        );
        assert_eq!(
            RealtimeEvent::parse("DispatchFinalized"),
            RealtimeEvent::DispatchFinalized
        );
    }

    #[test]
    fn test_unknown_events_do_not_trigger_refresh() {
        let event = RealtimeEvent::parse("SeatReserved");
        assert_eq!(event, RealtimeEvent::Other("SeatReserved".to_string()));
        assert!(!event.triggers_refresh());
        assert_eq!(event.name(), "SeatReserved");
    }

    #[test]
    fn test_dispatch_events_trigger_refresh() {
        assert!(RealtimeEvent::DispatchUpdated.triggers_refresh());
        assert!(RealtimeEvent::DispatchFinalized.triggers_refresh());
    }

    #[test]
    fn test_envelope_deserializes_without_data() {
        let json = r#"{"channel":"dispatch","event":"DispatchUpdated"}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.channel, "dispatch");
        assert_eq!(envelope.to_event(), RealtimeEvent::DispatchUpdated);
        assert!(envelope.data.is_null());
    }

    #[test]
    fn test_control_frame_shape() {
        let json = serde_json::to_string(&ControlFrame::Subscribe("dispatch".into())).unwrap();
        assert_eq!(json, r#"{"action":"subscribe","channel":"dispatch"}"#);
        let back: ControlFrame =
            serde_json::from_str(r#"{"action":"unsubscribe","channel":"dispatch"}"#).unwrap();
        assert_eq!(back, ControlFrame::Unsubscribe("dispatch".into()));
    }
}
