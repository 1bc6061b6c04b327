// MIT License - Copyright (c) 2026 Peter Wright
// Error types

/// All errors that can occur in the alarm panel library.
///
/// The two request errors carry the exact labels reported back to the
/// calling node, so `to_string()` is the wire label.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Missing payload, unknown state code, zone trigger without `modes`,
    /// or neither a state nor an alarm type to apply.
    #[error("invalid payload")]
    InvalidPayload,

    /// A zone triggered while the panel is in a mode the zone does not alarm in.
    #[error("no alarm")]
    NoAlarmForZone,

    #[error("Store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("Store encoding error: {0}")]
    StoreEncoding(#[from] serde_json::Error),
}

impl PanelError {
    /// Whether this is an expected rejection rather than a malformed request.
    ///
    /// A zone trigger outside its armed modes is routine, so callers should not
    /// treat it as a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(self, PanelError::NoAlarmForZone)
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
