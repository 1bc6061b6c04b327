// Schema validation tests for the flow message wire format
//
// These tests check hand-written JSON and serialized library values against
// the JSON Schema files in schemas/node/.

use std::sync::Arc;

use alarm_panel::{
    channel_listener, AlarmMode, AlarmPanel, MemoryStore, PanelError, PanelMessage,
    PanelNodeConfig, StateMessage, StateNotification, StateReply, StateRequest,
};
use serde_json::json;

fn load_schema(name: &str) -> serde_json::Value {
    let path = format!("{}/schemas/node/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| format!("  - {e}"))
        .collect();
    if !errors.is_empty() {
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            errors.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

// =========================================================================
// Inbound messages
// =========================================================================

#[test]
fn message_target_state_valid() {
    validate(
        "message.schema.json",
        &json!({ "payload": { "SecuritySystemTargetState": 1 } }),
    );
}

#[test]
fn message_homekit_valid() {
    validate(
        "message.schema.json",
        &json!({
            "topic": "alarm",
            "payload": { "SecuritySystemTargetState": 3 },
            "hap": { "context": { "session": "a1" } }
        }),
    );
}

#[test]
fn message_zone_trigger_valid() {
    validate(
        "message.schema.json",
        &json!({ "payload": { "zone": "front_door", "modes": [1, 2] } }),
    );
}

#[test]
fn message_zone_without_modes() {
    validate_fails(
        "message.schema.json",
        &json!({ "payload": { "zone": "front_door" } }),
    );
}

#[test]
fn message_mode_out_of_range() {
    validate_fails(
        "message.schema.json",
        &json!({ "payload": { "SecuritySystemCurrentState": 5 } }),
    );
}

#[test]
fn message_missing_payload() {
    validate_fails("message.schema.json", &json!({ "topic": "alarm" }));
}

#[test]
fn message_builders_serialize_valid() {
    let messages = [
        PanelMessage::new(StateRequest::target(AlarmMode::Night)),
        PanelMessage::new(StateRequest::current(AlarmMode::Off).with_alarm_type(0)),
        PanelMessage::new(StateRequest::zone("hall", &[AlarmMode::Away, AlarmMode::Night])),
        PanelMessage::new(StateRequest::target(AlarmMode::Away)).with_hap_context(json!(1)),
    ];
    for msg in &messages {
        validate("message.schema.json", &serde_json::to_value(msg).unwrap());
    }
}

// =========================================================================
// Notifications
// =========================================================================

#[test]
fn notification_change_valid() {
    validate(
        "notification.schema.json",
        &json!({
            "payload": {
                "SecuritySystemCurrentState": 4,
                "alarmState": "Alarm",
                "SecuritySystemAlarmType": 1,
                "isAlarm": true
            }
        }),
    );
}

#[test]
fn notification_from_homekit_valid() {
    validate(
        "notification.schema.json",
        &json!({
            "topic": "alarm",
            "payload": {
                "SecuritySystemCurrentState": 1,
                "alarmState": "Away",
                "isAlarm": false,
                "fromHomekit": true
            }
        }),
    );
}

#[test]
fn notification_from_homekit_false_rejected() {
    validate_fails(
        "notification.schema.json",
        &json!({
            "payload": {
                "SecuritySystemCurrentState": 1,
                "alarmState": "Away",
                "isAlarm": false,
                "fromHomekit": false
            }
        }),
    );
}

#[test]
fn notification_with_hap_rejected() {
    validate_fails(
        "notification.schema.json",
        &json!({
            "payload": {
                "SecuritySystemCurrentState": 0,
                "alarmState": "Home",
                "isAlarm": false
            },
            "hap": { "context": {} }
        }),
    );
}

#[test]
fn notification_unknown_mode_name() {
    validate_fails(
        "notification.schema.json",
        &json!({
            "payload": {
                "SecuritySystemCurrentState": 0,
                "alarmState": "Vacation",
                "isAlarm": false
            }
        }),
    );
}

#[test]
fn notification_serialized_valid() {
    for mode in alarm_panel::mode::ALL_MODES {
        let msg = StateMessage::new(StateNotification::new(mode, Some(0)));
        validate("notification.schema.json", &serde_json::to_value(&msg).unwrap());
    }
}

#[tokio::test]
async fn notification_from_panel_valid() {
    let panel = AlarmPanel::new(
        PanelNodeConfig::builder().registration_delay_ms(0).build(),
        Arc::new(MemoryStore::new()),
    );
    let (listener, mut rx) = channel_listener();
    panel.register_state_listener("schema", listener).await;

    // registration snapshot
    let snapshot = rx.recv().await.unwrap();
    validate("notification.schema.json", &serde_json::to_value(&snapshot).unwrap());

    let msg = PanelMessage::new(StateRequest::target(AlarmMode::Away))
        .with_field("topic", json!("alarm"))
        .with_hap_context(json!({ "id": "x" }));
    panel.set_state(msg).await.unwrap();
    let change = rx.recv().await.unwrap();
    validate("notification.schema.json", &serde_json::to_value(&change).unwrap());
}

// =========================================================================
// Replies
// =========================================================================

#[test]
fn reply_success_valid() {
    validate("reply.schema.json", &json!({ "label": "Away" }));
}

#[test]
fn reply_errors_valid() {
    validate("reply.schema.json", &json!({ "error": true, "label": "no alarm" }));
    validate("reply.schema.json", &json!({ "error": true, "label": "invalid payload" }));
}

#[test]
fn reply_error_with_mode_label() {
    validate_fails("reply.schema.json", &json!({ "error": true, "label": "Away" }));
}

#[test]
fn reply_serialized_valid() {
    validate(
        "reply.schema.json",
        &serde_json::to_value(StateReply::success(AlarmMode::Alarm)).unwrap(),
    );
    for err in [PanelError::InvalidPayload, PanelError::NoAlarmForZone] {
        validate(
            "reply.schema.json",
            &serde_json::to_value(StateReply::failure(&err)).unwrap(),
        );
    }
}
