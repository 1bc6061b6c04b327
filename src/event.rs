// MIT License - Copyright (c) 2026 Peter Wright
// State listeners and notification fan-out

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::message::StateMessage;

/// Identifier of a collaborating node, normally its flow node id.
pub type ListenerId = String;

/// Callback invoked with every state message a node should receive.
pub type Listener = Arc<dyn Fn(StateMessage) + Send + Sync>;

/// Receiving half of a [`channel_listener`].
pub type StateReceiver = mpsc::UnboundedReceiver<StateMessage>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(StateMessage) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Create a listener that forwards every message into a channel.
///
/// Messages sent after the receiver is dropped are discarded.
pub fn channel_listener() -> (Listener, StateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let l = listener(move |msg| {
        let _ = tx.send(msg);
    });
    (l, rx)
}

/// Listeners registered with a single panel.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: HashMap<ListenerId, Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `listener` under `id`, returning the listener it replaced.
    pub fn insert(&mut self, id: impl Into<ListenerId>, listener: Listener) -> Option<Listener> {
        self.listeners.insert(id.into(), listener)
    }

    /// Remove `id`. Returns false if it was not registered.
    pub fn remove(&mut self, id: &str) -> bool {
        self.listeners.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn ids(&self) -> Vec<ListenerId> {
        self.listeners.keys().cloned().collect()
    }

    /// Clone out the current listener set so dispatch can run without the registry.
    pub fn snapshot(&self) -> Vec<(ListenerId, Listener)> {
        self.listeners
            .iter()
            .map(|(id, l)| (id.clone(), Arc::clone(l)))
            .collect()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("ids", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// In-flight delivery of one message to a set of listeners.
///
/// Each listener runs in its own task with no ordering between them.
/// Dropping the handle detaches the tasks; [`FanOut::join`] waits for them.
#[derive(Debug, Default)]
pub struct FanOut {
    handles: Vec<JoinHandle<()>>,
}

impl FanOut {
    /// Spawn one delivery task per listener. Must be called inside a tokio runtime.
    pub fn dispatch(listeners: Vec<(ListenerId, Listener)>, msg: StateMessage) -> Self {
        let handles = listeners
            .into_iter()
            .map(|(id, l)| {
                let msg = msg.clone();
                tokio::spawn(async move {
                    trace!("Delivering state to {id}");
                    l(msg);
                })
            })
            .collect();
        Self { handles }
    }

    /// Number of listeners the message was dispatched to.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every delivery to finish. A panicking listener is logged and
    /// does not affect the others.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Listener delivery failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StateNotification;
    use crate::mode::AlarmMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message(mode: AlarmMode) -> StateMessage {
        StateMessage::new(StateNotification::new(mode, None))
    }

    #[test]
    fn test_registry_insert_replace_remove() {
        let mut reg = ListenerRegistry::new();
        assert_eq!(reg.len(), 0);

        assert!(reg.insert("a", listener(|_| {})).is_none());
        assert!(reg.insert("a", listener(|_| {})).is_some());
        reg.insert("b", listener(|_| {}));
        assert_eq!(reg.len(), 2);

        let mut ids = reg.ids();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);

        assert!(reg.remove("a"));
        assert!(!reg.remove("a"));
        assert_eq!(reg.ids(), ["b"]);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_listener() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut reg = ListenerRegistry::new();
        for id in ["a", "b", "c"] {
            let count = Arc::clone(&count);
            reg.insert(id, listener(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let fan_out = FanOut::dispatch(reg.snapshot(), message(AlarmMode::Away));
        assert_eq!(fan_out.len(), 3);
        fan_out.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fan_out_with_no_listeners() {
        let fan_out = FanOut::dispatch(Vec::new(), message(AlarmMode::Off));
        assert!(fan_out.is_empty());
        fan_out.join().await;
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_block_others() {
        let (good, mut rx) = channel_listener();
        let listeners = vec![
            ("bad".to_string(), listener(|_| panic!("listener bug"))),
            ("good".to_string(), good),
        ];

        FanOut::dispatch(listeners, message(AlarmMode::Night)).join().await;
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.payload.alarm_state, "Night");
    }

    #[tokio::test]
    async fn test_channel_listener_after_receiver_dropped() {
        let (l, rx) = channel_listener();
        drop(rx);
        l(message(AlarmMode::Home));
    }
}
