//! User preferences kept next to the conversations.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use heso_core::storage::{SlotStorage, StorageError};

/// Name of the slot holding the display name.
pub const USER_NAME_SLOT: &str = "heso.userName";

/// Name of the slot holding the theme.
pub const THEME_SLOT: &str = "heso.theme";

/// Color theme of the terminal front end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    /// Dark text, for light terminals.
    #[default]
    Light,
    /// Bright text, for dark terminals.
    Dark,
}

impl Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Returned when parsing an unknown theme name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme {0:?}, expected \"light\" or \"dark\"")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ParseThemeError(s.to_owned())),
        }
    }
}

/// Reads and writes user preferences.
///
/// Unreadable or invalid values fall back to defaults, settings never
/// stop the client from starting.
#[derive(Clone)]
pub struct Settings {
    storage: Arc<dyn SlotStorage>,
}

impl Settings {
    /// Creates settings backed by `storage`.
    #[inline]
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self { storage }
    }

    /// Returns the display name, if one has been set.
    pub fn display_name(&self) -> Option<String> {
        let name = self.read(USER_NAME_SLOT)?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(name.to_owned())
    }

    /// Sets the display name. An empty name clears it.
    pub fn set_display_name(&self, name: &str) -> Result<(), StorageError> {
        self.storage.write_slot(USER_NAME_SLOT, name.trim())
    }

    /// Returns the theme.
    pub fn theme(&self) -> Theme {
        let Some(raw) = self.read(THEME_SLOT) else {
            return Theme::default();
        };
        raw.parse().unwrap_or_else(|err| {
            warn!("ignoring stored theme: {err}");
            Theme::default()
        })
    }

    /// Sets the theme.
    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.storage.write_slot(THEME_SLOT, &theme.to_string())
    }

    fn read(&self, slot: &str) -> Option<String> {
        match self.storage.read_slot(slot) {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to read {slot}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use heso_core::storage::MemoryStorage;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new(Arc::new(MemoryStorage::new()));
        assert_eq!(settings.display_name(), None);
        assert_eq!(settings.theme(), Theme::Light);
    }

    #[test]
    fn test_round_trip() {
        let storage = MemoryStorage::new();
        let settings = Settings::new(Arc::new(storage.clone()));
        settings.set_display_name("  Daniil ").unwrap();
        settings.set_theme(Theme::Dark).unwrap();

        let reloaded = Settings::new(Arc::new(storage.clone()));
        assert_eq!(reloaded.display_name().as_deref(), Some("Daniil"));
        assert_eq!(reloaded.theme(), Theme::Dark);
        assert_eq!(
            storage.read_slot(THEME_SLOT).unwrap().as_deref(),
            Some("dark")
        );

        reloaded.set_display_name("").unwrap();
        assert_eq!(reloaded.display_name(), None);
    }

    #[test]
    fn test_invalid_theme_falls_back() {
        let storage = MemoryStorage::new();
        storage.write_slot(THEME_SLOT, "purple").unwrap();
        let settings = Settings::new(Arc::new(storage));
        assert_eq!(settings.theme(), Theme::Light);
    }

    #[test]
    fn test_parse_theme() {
        assert_eq!(" Dark ".parse::<Theme>(), Ok(Theme::Dark));
        assert!("blue".parse::<Theme>().is_err());
    }
}
