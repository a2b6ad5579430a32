//! Input sources addressed by HomeKit identifier slots.
//!
//! Slots `1..=RESERVED_SLOTS` are fixed system screens defined here; every
//! slot above that is a device-reported title.

use super::title::Title;

/// Identifier returned whenever the real one cannot be determined.
pub const DEFAULT_IDENTIFIER: u32 = 1;

/// A system screen reachable by a fixed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemSource {
    pub slot: u32,
    pub name: &'static str,
    /// Bodiless POST path that opens the screen.
    pub command: &'static str,
}

pub const SYSTEM_SOURCES: [SystemSource; 4] = [
    SystemSource {
        slot: 1,
        name: "Wii U Menu",
        command: "/launch/menu",
    },
    SystemSource {
        slot: 2,
        name: "System Settings",
        command: "/launch/settings",
    },
    SystemSource {
        slot: 3,
        name: "Internet Settings",
        command: "/launch/settings/internet",
    },
    SystemSource {
        slot: 4,
        name: "Data Management",
        command: "/launch/settings/data_management",
    },
];

/// Number of reserved system slots.
pub const RESERVED_SLOTS: u32 = SYSTEM_SOURCES.len() as u32;

/// First slot handed to a device-reported title.
pub const FIRST_TITLE_SLOT: u32 = RESERVED_SLOTS + 1;

pub fn system_source(slot: u32) -> Option<&'static SystemSource> {
    SYSTEM_SOURCES.iter().find(|s| s.slot == slot)
}

pub fn is_reserved(slot: u32) -> bool {
    system_source(slot).is_some()
}

/// HomeKit InputSourceType values used by this accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InputSourceType {
    Other = 0,
    HomeScreen = 1,
    Application = 10,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Fixed(&'static SystemSource),
    Dynamic(Title),
}

impl InputSource {
    pub fn name(&self) -> &str {
        match self {
            InputSource::Fixed(source) => source.name,
            InputSource::Dynamic(title) => &title.name,
        }
    }

    pub fn source_type(&self) -> InputSourceType {
        match self {
            InputSource::Fixed(source) if source.slot == DEFAULT_IDENTIFIER => {
                InputSourceType::HomeScreen
            }
            InputSource::Fixed(_) => InputSourceType::Other,
            InputSource::Dynamic(_) => InputSourceType::Application,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_slots_are_contiguous_from_one() {
        for (i, source) in SYSTEM_SOURCES.iter().enumerate() {
            assert_eq!(source.slot, i as u32 + 1);
        }
        assert_eq!(FIRST_TITLE_SLOT, 5);
        assert!(is_reserved(1));
        assert!(is_reserved(RESERVED_SLOTS));
        assert!(!is_reserved(FIRST_TITLE_SLOT));
        assert!(!is_reserved(0));
    }

    #[test]
    fn test_source_types() {
        let menu = InputSource::Fixed(system_source(1).unwrap());
        let settings = InputSource::Fixed(system_source(2).unwrap());
        let game = InputSource::Dynamic(Title::new("0005000010101c00", "Splatoon"));

        assert_eq!(menu.source_type(), InputSourceType::HomeScreen);
        assert_eq!(settings.source_type(), InputSourceType::Other);
        assert_eq!(game.source_type(), InputSourceType::Application);
        assert_eq!(game.name(), "Splatoon");
    }
}
