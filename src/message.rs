// MIT License - Copyright (c) 2026 Peter Wright
// Flow message wire types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PanelError;
use crate::mode::AlarmMode;

/// An inbound flow message addressed to the panel.
///
/// Only `payload` and `hap` are interpreted; every other field (`topic`,
/// `_msgid`, ...) is carried through to the outbound notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StateRequest>,
    /// Metadata attached by the HomeKit bridge node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hap: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PanelMessage {
    pub fn new(payload: StateRequest) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// Attach HomeKit bridge metadata with the given `context`.
    pub fn with_hap_context(mut self, context: Value) -> Self {
        let mut hap = Map::new();
        hap.insert("context".to_string(), context);
        self.hap = Some(Value::Object(hap));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// True when the message carries a truthy `hap.context`.
    pub fn has_hap_context(&self) -> bool {
        self.hap
            .as_ref()
            .and_then(|hap| hap.get("context"))
            .is_some_and(is_truthy)
    }
}

/// Requested change, as sent by HomeKit, keypads and sensor zones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRequest {
    #[serde(
        rename = "SecuritySystemTargetState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_state: Option<i64>,
    #[serde(
        rename = "SecuritySystemCurrentState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_state: Option<i64>,
    #[serde(
        rename = "SecuritySystemAlarmType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alarm_type: Option<i64>,
    /// Set by sensor nodes; any truthy value marks a zone trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Value>,
    /// Mode codes in which the triggering zone raises the alarm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modes: Option<Vec<i64>>,
}

impl StateRequest {
    /// A target-state command, as HomeKit sends it.
    pub fn target(mode: AlarmMode) -> Self {
        Self {
            target_state: Some(mode.code().into()),
            ..Self::default()
        }
    }

    /// A current-state report from a locally observed change.
    pub fn current(mode: AlarmMode) -> Self {
        Self {
            current_state: Some(mode.code().into()),
            ..Self::default()
        }
    }

    /// A sensor trigger from `zone`, alarming only in `modes`.
    pub fn zone(zone: impl Into<Value>, modes: &[AlarmMode]) -> Self {
        Self {
            zone: Some(zone.into()),
            modes: Some(modes.iter().map(|m| i64::from(m.code())).collect()),
            ..Self::default()
        }
    }

    pub fn with_alarm_type(mut self, alarm_type: i64) -> Self {
        self.alarm_type = Some(alarm_type);
        self
    }

    pub fn is_zone_trigger(&self) -> bool {
        self.zone.as_ref().is_some_and(is_truthy)
    }

    /// The mode this request asks for: the reported current state wins over
    /// the target state.
    pub fn requested_mode(&self) -> Result<Option<AlarmMode>, PanelError> {
        match self.current_state.or(self.target_state) {
            Some(code) => AlarmMode::from_code(code)
                .map(Some)
                .ok_or(PanelError::InvalidPayload),
            None => Ok(None),
        }
    }
}

/// State pushed to listeners on change and on registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNotification {
    #[serde(rename = "SecuritySystemCurrentState")]
    pub current_state: u8,
    #[serde(rename = "alarmState")]
    pub alarm_state: String,
    #[serde(
        rename = "SecuritySystemAlarmType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alarm_type: Option<i64>,
    #[serde(rename = "isAlarm")]
    pub is_alarm: bool,
    #[serde(
        rename = "fromHomekit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub from_homekit: Option<bool>,
}

impl StateNotification {
    pub fn new(mode: AlarmMode, alarm_type: Option<i64>) -> Self {
        Self {
            current_state: mode.code(),
            alarm_state: mode.name().to_string(),
            alarm_type,
            is_alarm: mode.is_alarm(),
            from_homekit: None,
        }
    }
}

/// Outbound message delivered to every listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub payload: StateNotification,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateMessage {
    pub fn new(payload: StateNotification) -> Self {
        Self {
            payload,
            extra: Map::new(),
        }
    }
}

/// Result reported back to the node that called `set_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReply {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    pub label: String,
}

impl StateReply {
    pub fn success(mode: AlarmMode) -> Self {
        Self {
            error: false,
            label: mode.name().to_string(),
        }
    }

    pub fn failure(err: &PanelError) -> Self {
        Self {
            error: true,
            label: err.to_string(),
        }
    }
}

/// Loose truthiness of flow message values: null, false, 0 and "" are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
