//! HomeKit-side value types for the television accessory.

use crate::catalog::{InputSource, InputSourceType};
use crate::ristretto::client::BATTERY_MAX;
use crate::ristretto::facade::SystemInfo;
use strum::{Display, EnumIter};

pub const MANUFACTURER: &str = "Nintendo";

/// Display name of the momentary reboot Switch service.
pub const REBOOT_SWITCH_NAME: &str = "Reboot Wii U";

/// Battery level at or below which HomeKit shows a low-battery warning.
pub const LOW_BATTERY_PERCENT: u8 = 20;

/// Active characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Active {
    Inactive,
    Active,
}

impl From<u8> for Active {
    fn from(value: u8) -> Self {
        if value == 0 {
            Active::Inactive
        } else {
            Active::Active
        }
    }
}

/// RemoteKey characteristic values as defined by HomeKit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[repr(u8)]
pub enum RemoteKey {
    Rewind = 0,
    FastForward = 1,
    NextTrack = 2,
    PreviousTrack = 3,
    ArrowUp = 4,
    ArrowDown = 5,
    ArrowLeft = 6,
    ArrowRight = 7,
    Select = 8,
    Back = 9,
    Exit = 10,
    PlayPause = 11,
    Information = 15,
}

impl RemoteKey {
    pub fn from_raw(value: u8) -> Option<Self> {
        use RemoteKey::*;
        Some(match value {
            0 => Rewind,
            1 => FastForward,
            2 => NextTrack,
            3 => PreviousTrack,
            4 => ArrowUp,
            5 => ArrowDown,
            6 => ArrowLeft,
            7 => ArrowRight,
            8 => Select,
            9 => Back,
            10 => Exit,
            11 => PlayPause,
            15 => Information,
            _ => return None,
        })
    }

    /// Wii U GamePad button mask sent to `/remote/key`.
    pub fn button_mask(self) -> u32 {
        match self {
            RemoteKey::Select => 0x8000,        // A
            RemoteKey::Back => 0x4000,          // B
            RemoteKey::ArrowLeft => 0x0800,
            RemoteKey::ArrowRight => 0x0400,
            RemoteKey::ArrowUp => 0x0200,
            RemoteKey::ArrowDown => 0x0100,
            RemoteKey::PreviousTrack => 0x0080, // ZL
            RemoteKey::NextTrack => 0x0040,     // ZR
            RemoteKey::Rewind => 0x0020,        // L
            RemoteKey::FastForward => 0x0010,   // R
            RemoteKey::PlayPause => 0x0008,     // +
            RemoteKey::Information => 0x0004,   // -
            RemoteKey::Exit => 0x0002,          // HOME
        }
    }
}

/// Battery service state.
///
/// The console reports `0..=6`; `0` means both "charging" and "full", so it
/// maps to 100% charging. Callers should not try to tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub level: u8,
    pub charging: bool,
}

impl BatteryStatus {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            return Self {
                level: 100,
                charging: true,
            };
        }
        let raw = u32::from(raw.min(BATTERY_MAX));
        let max = u32::from(BATTERY_MAX);
        let level = (raw * 100 + max / 2) / max;
        Self {
            level: level as u8,
            charging: false,
        }
    }

    pub fn is_low(&self) -> bool {
        !self.charging && self.level <= LOW_BATTERY_PERCENT
    }
}

/// AccessoryInformation service values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_revision: String,
}

impl From<SystemInfo> for AccessoryInformation {
    fn from(info: SystemInfo) -> Self {
        Self {
            manufacturer: MANUFACTURER.to_string(),
            model: info.model,
            serial_number: info.serial,
            firmware_revision: info.firmware_version,
        }
    }
}

/// One InputSource service the host should expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSourceDescriptor {
    pub identifier: u32,
    pub name: String,
    pub source_type: InputSourceType,
    pub configured: bool,
}

impl InputSourceDescriptor {
    pub fn new(identifier: u32, source: &InputSource) -> Self {
        Self {
            identifier,
            name: source.name().to_string(),
            source_type: source.source_type(),
            configured: true,
        }
    }
}

/// A value pushed to the host outside of a read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacteristicUpdate {
    Active(Active),
    ActiveIdentifier(u32),
    Battery(BatteryStatus),
    RebootSwitch(bool),
    InputSources(Vec<InputSourceDescriptor>),
    Information(AccessoryInformation),
}
