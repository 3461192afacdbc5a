//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/tetris/settings.toml (or platform equivalent)

use crate::input::parse_key;
use crate::tetromino::MAX_SHAPE_SIZE;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Largest board side the terminal layout supports
pub const MAX_BOARD_SIZE: usize = 100;

/// Errors raised while loading, validating or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Game settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Board dimensions
    pub board: BoardSettings,
    /// Gravity, lock delay and key repeat timings
    pub timing: TimingSettings,
    /// Point awards
    pub scoring: ScoringSettings,
    /// Keybindings
    pub keys: KeyBindings,
    /// Audio settings
    pub audio: AudioSettings,
    /// Visual settings
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Time between gravity steps
    pub fall_interval_ms: u64,
    /// Grace period on the ground before a piece locks
    pub lock_delay_ms: u64,
    /// Hold time before a held key starts repeating
    pub key_repeat_delay_ms: u64,
    /// Time between repeats once repeating
    pub key_repeat_rate_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Points per row moved by soft drop
    pub soft_drop_points: u64,
    /// Entry n-1 is the award for clearing n lines at once
    pub line_clear: Vec<u64>,
}

/// Key bindings (stored as strings for easy editing)
/// Each action can have one or more keys bound to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_left: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_right: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub soft_drop: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub rotate: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub quit: Vec<String>,
}

/// Deserialize keys as either a single string or array of strings
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct KeysVisitor;

    impl<'de> Visitor<'de> for KeysVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut keys = Vec::new();
            while let Some(key) = seq.next_element::<String>()? {
                keys.push(key);
            }
            Ok(keys)
        }
    }

    deserializer.deserialize_any(KeysVisitor)
}

/// Serialize keys: single key as string, multiple as array
fn serialize_keys<S>(keys: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    if keys.len() == 1 {
        serializer.serialize_str(&keys[0])
    } else {
        let mut seq = serializer.serialize_seq(Some(keys.len()))?;
        for key in keys {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

/// Audio settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub enabled: bool,
    /// Background melody volume (0-100)
    pub music_volume: u32,
    /// Sound effect volume (0-100)
    pub sfx_volume: u32,
}

/// Visual settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Block style: "solid", "bracket", "round"
    pub block_style: String,
    /// How long the game over screen stays up before exiting
    pub game_over_ms: u64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            width: crate::board::DEFAULT_WIDTH,
            height: crate::board::DEFAULT_HEIGHT,
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            fall_interval_ms: 50,
            lock_delay_ms: 5,
            key_repeat_delay_ms: 200,
            key_repeat_rate_ms: 50,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            soft_drop_points: 2,
            line_clear: vec![100, 400, 900, 2000],
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_left: vec!["Left".to_string()],
            move_right: vec!["Right".to_string()],
            soft_drop: vec!["Down".to_string()],
            rotate: vec!["Up".to_string(), "x".to_string()],
            quit: vec!["q".to_string(), "Esc".to_string()],
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            music_volume: 20,
            sfx_volume: 50,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            block_style: "solid".to_string(),
            game_over_ms: 3000,
        }
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "tetris", "tetris").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings from the config directory
    ///
    /// A missing file yields the defaults and writes them out for editing.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_or_default(Self::settings_path().as_deref())
    }

    /// Load from `path`, falling back to defaults when there is no config
    /// location or no file there yet
    fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            tracing::warn!("No config directory, using default settings");
            return Ok(Self::default());
        };
        if !path.exists() {
            let settings = Self::default();
            tracing::info!("No settings at {}, using defaults", path.display());
            if let Err(e) = settings.save_to(path) {
                tracing::warn!("Could not write default settings: {}", e);
            }
            return Ok(settings);
        }
        Self::load_from(path)
    }

    /// Load and validate settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            toml::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(io_err)?;
        Ok(())
    }

    /// Reject settings the game cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::Invalid(msg));

        if self.board.width == 0 || self.board.height == 0 {
            return invalid(format!(
                "board must be at least 1x1, got {}x{}",
                self.board.width, self.board.height
            ));
        }
        if self.board.width < MAX_SHAPE_SIZE {
            return invalid(format!(
                "board width {} is narrower than the I piece ({})",
                self.board.width, MAX_SHAPE_SIZE
            ));
        }
        if self.board.width > MAX_BOARD_SIZE || self.board.height > MAX_BOARD_SIZE {
            return invalid(format!(
                "board {}x{} is larger than {}x{}",
                self.board.width, self.board.height, MAX_BOARD_SIZE, MAX_BOARD_SIZE
            ));
        }
        if self.timing.key_repeat_rate_ms == 0 {
            return invalid("key_repeat_rate_ms must be greater than 0".to_string());
        }
        if self.audio.music_volume > 100 || self.audio.sfx_volume > 100 {
            return invalid("volumes must be between 0 and 100".to_string());
        }
        if !matches!(self.display.block_style.as_str(), "solid" | "bracket" | "round") {
            return invalid(format!(
                "unknown block_style {:?} (expected solid, bracket or round)",
                self.display.block_style
            ));
        }

        let bindings = [
            ("move_left", &self.keys.move_left),
            ("move_right", &self.keys.move_right),
            ("soft_drop", &self.keys.soft_drop),
            ("rotate", &self.keys.rotate),
            ("quit", &self.keys.quit),
        ];
        for (action, keys) in bindings {
            if keys.is_empty() {
                return invalid(format!("no key bound to {}", action));
            }
            if let Some(bad) = keys.iter().find(|k| parse_key(k).is_none()) {
                return invalid(format!("unknown key {:?} bound to {}", bad, action));
            }
        }

        Ok(())
    }
}

impl DisplaySettings {
    /// Get the block characters based on style
    pub fn block_chars(&self) -> &'static str {
        match self.block_style.as_str() {
            "bracket" => "[]",
            "round" => "()",
            _ => "██", // "solid" or default
        }
    }
}
