// MIT License - Copyright (c) 2026 Peter Wright
// Node configuration

use std::time::Duration;

use crate::constants::DEFAULT_REGISTRATION_DELAY_MS;

/// Configuration for one alarm panel node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelNodeConfig {
    /// Flow node id of the panel
    pub id: String,
    /// Display name used in log lines
    pub name: String,
    /// Delay before a new listener receives its snapshot (default: 100)
    pub registration_delay_ms: u64,
}

impl Default for PanelNodeConfig {
    fn default() -> Self {
        Self {
            id: "alarm-panel".to_string(),
            name: "Alarm Panel".to_string(),
            registration_delay_ms: DEFAULT_REGISTRATION_DELAY_MS,
        }
    }
}

impl PanelNodeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelNodeConfigBuilder {
        PanelNodeConfigBuilder::default()
    }

    pub fn registration_delay(&self) -> Duration {
        Duration::from_millis(self.registration_delay_ms)
    }
}

/// Builder for PanelNodeConfig.
#[derive(Debug, Clone, Default)]
pub struct PanelNodeConfigBuilder {
    config: PanelNodeConfig,
}

impl PanelNodeConfigBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn registration_delay_ms(mut self, ms: u64) -> Self {
        self.config.registration_delay_ms = ms;
        self
    }

    pub fn build(self) -> PanelNodeConfig {
        self.config
    }
}
