// MIT License - Copyright (c) 2026 Peter Wright
//
//! # alarm-panel
//!
//! A security alarm panel node for flow-based home automation.
//!
//! The panel keeps the security system mode (Home, Away, Night, Off, Alarm)
//! and the alarm type, persists both to a host-provided key-value store, and
//! pushes every change to the nodes that registered as state listeners.
//! HomeKit target-state commands, local current-state reports and sensor zone
//! triggers all arrive through [`AlarmPanel::set_state`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use alarm_panel::{AlarmMode, AlarmPanel, MemoryStore, PanelMessage, PanelNodeConfig, StateRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let panel = Arc::new(AlarmPanel::new(
//!         PanelNodeConfig::builder().id("panel-1").build(),
//!         Arc::new(MemoryStore::new()),
//!     ));
//!
//!     let (listener, mut states) = alarm_panel::channel_listener();
//!     panel.register_state_listener("siren", listener).await;
//!     tokio::spawn(async move {
//!         while let Some(msg) = states.recv().await {
//!             println!("State: {:?}", msg.payload);
//!         }
//!     });
//!
//!     panel.set_state(PanelMessage::new(StateRequest::target(AlarmMode::Away))).await?;
//!     panel
//!         .set_state(PanelMessage::new(StateRequest::zone("front_door", &[AlarmMode::Away])))
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod message;
pub mod mode;
pub mod panel;
pub mod store;

// Re-exports for convenience
pub use config::{PanelNodeConfig, PanelNodeConfigBuilder};
pub use error::{PanelError, Result};
pub use event::{channel_listener, listener, FanOut, Listener, ListenerId, StateReceiver};
pub use message::{PanelMessage, StateMessage, StateNotification, StateReply, StateRequest};
pub use mode::AlarmMode;
pub use panel::{AlarmPanel, SetStateOutcome};
pub use store::{FileStore, MemoryStore, StateStore};
