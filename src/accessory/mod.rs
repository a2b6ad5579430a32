//! HomeKit television accessory for one console.
//!
//! The host owns the HAP side; this module produces the values it serves and
//! consumes the writes it receives.

pub mod characteristics;
pub mod poll;
pub mod television;

pub use characteristics::{
    AccessoryInformation, Active, BatteryStatus, CharacteristicUpdate, InputSourceDescriptor,
    REBOOT_SWITCH_NAME, RemoteKey,
};
pub use television::{CharacteristicPusher, WiiUTelevision};
