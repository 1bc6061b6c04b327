// MIT License - Copyright (c) 2026 Peter Wright
// Shared constants

/// Shared store key holding the current mode code (0-4).
pub const KEY_CURRENT_STATE: &str = "SecuritySystemCurrentState";

/// Shared store key holding the current alarm type code.
pub const KEY_ALARM_TYPE: &str = "SecuritySystemAlarmType";

/// Alarm type when no alarm is active.
pub const ALARM_TYPE_NONE: i64 = 0;

/// Alarm type set by a zone trigger.
pub const ALARM_TYPE_TRIGGERED: i64 = 1;

/// Delay before a newly registered listener receives its state snapshot.
pub const DEFAULT_REGISTRATION_DELAY_MS: u64 = 100;
