// MIT License - Copyright (c) 2026 Peter Wright
// Security system modes

use std::fmt;

/// Security system mode, numbered as in the HomeKit security system service.
///
/// `Alarm` is the only mode in which an alarm type other than 0 is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AlarmMode {
    /// Armed for occupants at home (stay)
    #[default]
    Home = 0,
    /// Fully armed, nobody home
    Away = 1,
    /// Armed for the night
    Night = 2,
    /// Disarmed
    Off = 3,
    /// Alarm triggered
    Alarm = 4,
}

/// All modes in code order.
pub const ALL_MODES: [AlarmMode; 5] = [
    AlarmMode::Home,
    AlarmMode::Away,
    AlarmMode::Night,
    AlarmMode::Off,
    AlarmMode::Alarm,
];

impl AlarmMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Home),
            1 => Some(Self::Away),
            2 => Some(Self::Night),
            3 => Some(Self::Off),
            4 => Some(Self::Alarm),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Mode label used in replies and the `alarmState` notification field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Away => "Away",
            Self::Night => "Night",
            Self::Off => "Off",
            Self::Alarm => "Alarm",
        }
    }

    pub fn is_alarm(&self) -> bool {
        matches!(self, Self::Alarm)
    }
}

impl fmt::Display for AlarmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
