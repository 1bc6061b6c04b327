// MIT License - Copyright (c) 2026 Peter Wright
// Alarm panel node

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PanelNodeConfig;
use crate::constants::{ALARM_TYPE_NONE, ALARM_TYPE_TRIGGERED, KEY_ALARM_TYPE, KEY_CURRENT_STATE};
use crate::error::{PanelError, Result};
use crate::event::{FanOut, Listener, ListenerId, ListenerRegistry};
use crate::message::{PanelMessage, StateMessage, StateNotification, StateReply};
use crate::mode::AlarmMode;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PanelState {
    alarm_state: AlarmMode,
    alarm_type: i64,
}

impl PanelState {
    fn notification(&self) -> StateNotification {
        StateNotification::new(self.alarm_state, Some(self.alarm_type))
    }
}

/// What a `set_state` call did.
#[derive(Debug)]
pub struct SetStateOutcome {
    /// Panel mode after the call
    pub mode: AlarmMode,
    /// Alarm type after the call
    pub alarm_type: i64,
    /// Whether the mode or alarm type changed
    pub changed: bool,
    /// Listener deliveries, present only when something changed
    pub fan_out: Option<FanOut>,
}

impl SetStateOutcome {
    pub fn label(&self) -> &'static str {
        self.mode.name()
    }
}

impl From<&Result<SetStateOutcome>> for StateReply {
    fn from(result: &Result<SetStateOutcome>) -> Self {
        match result {
            Ok(outcome) => StateReply::success(outcome.mode),
            Err(e) => StateReply::failure(e),
        }
    }
}

/// A security alarm panel shared by the nodes of a flow.
///
/// The panel owns the current mode and alarm type, persists both to the
/// shared store on every change, and pushes changes to its registered
/// listeners.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use alarm_panel::{AlarmMode, AlarmPanel, MemoryStore, PanelMessage, PanelNodeConfig, StateRequest};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let panel = AlarmPanel::new(PanelNodeConfig::default(), Arc::new(MemoryStore::new()));
///
///     let (listener, mut states) = alarm_panel::channel_listener();
///     panel.register_state_listener("keypad", listener).await;
///
///     let outcome = panel
///         .set_state(PanelMessage::new(StateRequest::target(AlarmMode::Away)))
///         .await?;
///     println!("now {}", outcome.label());
///
///     while let Some(msg) = states.recv().await {
///         println!("keypad got {:?}", msg.payload);
///     }
///     Ok(())
/// }
/// ```
pub struct AlarmPanel {
    config: PanelNodeConfig,
    store: Arc<dyn StateStore>,
    state: Arc<RwLock<PanelState>>,
    listeners: RwLock<ListenerRegistry>,
}

impl AlarmPanel {
    /// Create the panel, restoring mode and alarm type from `store`.
    ///
    /// Missing keys default to Home with no alarm. An unknown stored mode
    /// code is ignored.
    pub fn new(config: PanelNodeConfig, store: Arc<dyn StateStore>) -> Self {
        let alarm_state = match store.get(KEY_CURRENT_STATE) {
            Some(code) => AlarmMode::from_code(code).unwrap_or_else(|| {
                warn!("Ignoring stored mode {code}, defaulting to Home");
                AlarmMode::Home
            }),
            None => AlarmMode::Home,
        };
        let alarm_type = store.get(KEY_ALARM_TYPE).unwrap_or(ALARM_TYPE_NONE);
        info!(
            "{}: restored mode {} (alarm type {})",
            config.name, alarm_state, alarm_type
        );

        Self {
            config,
            store,
            state: Arc::new(RwLock::new(PanelState {
                alarm_state,
                alarm_type,
            })),
            listeners: RwLock::new(ListenerRegistry::new()),
        }
    }

    pub fn config(&self) -> &PanelNodeConfig {
        &self.config
    }

    // --- State Accessors ---

    pub async fn alarm_state(&self) -> AlarmMode {
        self.state.read().await.alarm_state
    }

    pub async fn alarm_type(&self) -> i64 {
        self.state.read().await.alarm_type
    }

    pub async fn is_alarm(&self) -> bool {
        self.state.read().await.alarm_state.is_alarm()
    }

    /// Current state as sent to a newly registered listener.
    pub async fn snapshot(&self) -> StateNotification {
        self.state.read().await.notification()
    }

    /// Set the mode and persist it. Listeners are not notified.
    pub async fn set_alarm_state(&self, mode: AlarmMode) {
        let mut state = self.state.write().await;
        self.apply_alarm_state(&mut state, mode);
    }

    /// Set the alarm type and persist it. Listeners are not notified.
    pub async fn set_alarm_type(&self, alarm_type: i64) {
        let mut state = self.state.write().await;
        self.apply_alarm_type(&mut state, alarm_type);
    }

    fn apply_alarm_state(&self, state: &mut PanelState, mode: AlarmMode) {
        state.alarm_state = mode;
        self.persist(KEY_CURRENT_STATE, mode.code().into());
    }

    fn apply_alarm_type(&self, state: &mut PanelState, alarm_type: i64) {
        state.alarm_type = alarm_type;
        self.persist(KEY_ALARM_TYPE, alarm_type);
    }

    fn persist(&self, key: &str, value: i64) {
        if let Err(e) = self.store.set(key, value) {
            warn!("Failed to persist {key}={value}: {e}");
        }
    }

    // --- Listeners ---

    /// Register `listener` under `id`, replacing any listener with that id.
    ///
    /// The listener receives one snapshot of the state after the configured
    /// registration delay, so the registering node has time to wire up its
    /// input first. The snapshot is read when it is delivered, so it is never
    /// older than a change the listener was sent in the meantime. The returned
    /// handle may be dropped.
    pub async fn register_state_listener(
        &self,
        id: impl Into<ListenerId>,
        listener: Listener,
    ) -> JoinHandle<()> {
        let id = id.into();
        {
            // Same lock order as set_state: a concurrent change either sees
            // this listener or is already in the state the snapshot reads.
            let _state = self.state.read().await;
            let mut listeners = self.listeners.write().await;
            if listeners.insert(id.clone(), Arc::clone(&listener)).is_some() {
                debug!("Replaced listener {id}");
            }
        }
        info!("register: {id}");

        let delay = self.config.registration_delay();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Held across delivery so no later change can overtake the snapshot
            let state = state.read().await;
            listener(StateMessage::new(state.notification()));
        })
    }

    /// Remove the listener registered under `id`. Returns false if there was none.
    pub async fn deregister_state_listener(&self, id: &str) -> bool {
        info!("deregister: {id}");
        self.listeners.write().await.remove(id)
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    pub async fn listener_ids(&self) -> Vec<ListenerId> {
        self.listeners.read().await.ids()
    }

    /// Deliver `msg` to every registered listener, tagging HomeKit-originated
    /// changes with `fromHomekit`.
    pub async fn notify_change(&self, msg: StateMessage, from_homekit: bool) -> FanOut {
        let listeners = self.listeners.read().await.snapshot();
        dispatch(listeners, msg, from_homekit)
    }

    // --- State Updates ---

    /// Apply an inbound state request.
    ///
    /// A reported current state takes precedence over a target state. A zone
    /// trigger raises the alarm only when the panel is in one of the zone's
    /// `modes`. Any mode other than Alarm clears the alarm type. Listeners are
    /// notified only if the mode or alarm type actually changed.
    ///
    /// A zone trigger ignores the request's state fields, so an unknown state
    /// code only fails a request that is not a zone trigger.
    pub async fn set_state(&self, msg: PanelMessage) -> Result<SetStateOutcome> {
        debug!(
            "set_state: {}",
            serde_json::to_string(&msg).unwrap_or_default()
        );

        let result = self.apply_request(msg).await;
        if let Err(e) = &result {
            if e.is_rejection() {
                info!("{}: {e}", self.config.name);
            } else {
                error!("{}: {e}", self.config.name);
            }
        }
        result
    }

    async fn apply_request(&self, msg: PanelMessage) -> Result<SetStateOutcome> {
        let hap_context = msg.has_hap_context();
        let PanelMessage { payload, extra, .. } = msg;
        let Some(request) = payload else {
            debug!("payload missing");
            return Err(PanelError::InvalidPayload);
        };

        let mut state = self.state.write().await;

        let (new_state, mut alarm_type) = if request.is_zone_trigger() {
            let zone = request.zone.as_ref().map(ToString::to_string).unwrap_or_default();
            let Some(modes) = request.modes.as_ref() else {
                debug!("zone {zone} without modes");
                return Err(PanelError::InvalidPayload);
            };
            if !modes.contains(&i64::from(state.alarm_state.code())) {
                debug!("zone {zone} not armed in {}", state.alarm_state);
                return Err(PanelError::NoAlarmForZone);
            }
            info!("Alarm: zone {zone} triggered in {}", state.alarm_state);
            (Some(AlarmMode::Alarm), ALARM_TYPE_TRIGGERED)
        } else {
            let new_state = request.requested_mode().inspect_err(|_| {
                debug!(
                    "unknown state {:?}",
                    request.current_state.or(request.target_state)
                );
            })?;
            (new_state, request.alarm_type.unwrap_or(state.alarm_type))
        };

        debug!(
            "newState: {:?} = {:?} || {:?}, localState: {}",
            new_state, request.target_state, request.current_state, state.alarm_state
        );
        debug!(
            "alarmType: {} = {:?} || {}",
            alarm_type, request.alarm_type, state.alarm_type
        );

        if new_state.is_none() && request.alarm_type.is_none() {
            debug!("no state or alarm type");
            return Err(PanelError::InvalidPayload);
        }

        let mode = new_state.unwrap_or(state.alarm_state);
        if !mode.is_alarm() {
            alarm_type = ALARM_TYPE_NONE;
        }
        let alarm_changed = state.alarm_type != alarm_type;
        let changed = new_state != Some(state.alarm_state) || alarm_changed;
        if !changed {
            debug!("no change");
            return Ok(SetStateOutcome {
                mode: state.alarm_state,
                alarm_type: state.alarm_type,
                changed: false,
                fan_out: None,
            });
        }

        self.apply_alarm_state(&mut state, mode);
        self.apply_alarm_type(&mut state, alarm_type);
        info!("{}: mode {} (alarm type {})", self.config.name, mode, alarm_type);

        let out = StateMessage {
            payload: StateNotification::new(mode, alarm_changed.then_some(alarm_type)),
            extra,
        };
        let from_homekit = hap_context && request.target_state.is_some();

        // Snapshot listeners before releasing the state lock so a change is
        // never delivered to a listener registered after it.
        let listeners = self.listeners.read().await.snapshot();
        drop(state);

        let fan_out = dispatch(listeners, out, from_homekit);
        Ok(SetStateOutcome {
            mode,
            alarm_type,
            changed: true,
            fan_out: Some(fan_out),
        })
    }
}

fn dispatch(listeners: Vec<(ListenerId, Listener)>, mut msg: StateMessage, from_homekit: bool) -> FanOut {
    if from_homekit {
        info!("from homekit");
        msg.payload.from_homekit = Some(true);
    } else {
        info!("local");
    }
    debug!("notify: {}", serde_json::to_string(&msg).unwrap_or_default());
    FanOut::dispatch(listeners, msg)
}
