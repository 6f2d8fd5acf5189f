use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::playback::{PlaybackOptions, StrokeRange};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    /// Base URL of the device bridge
    pub server_url: String,
    /// JSON record file or funscript directory
    pub library_path: PathBuf,
    pub stroke_min: u8,
    pub stroke_max: u8,
    pub slow_mode: bool,
    /// Log commands instead of sending them
    pub dry_run: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            library_path: PathBuf::from("funscripts"),
            stroke_min: 0,
            stroke_max: 100,
            slow_mode: false,
            dry_run: false,
        }
    }
}

impl PlayerSettings {
    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            range: StrokeRange::clamped(self.stroke_min, self.stroke_max),
            slow_mode: self.slow_mode,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PlayerSettings>,
}

impl SettingsStore {
    /// A missing file means defaults; an unparsable one is reported and
    /// replaced by defaults.
    /// Loads settings from `path`, writing the defaults there on first run.
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            let defaults = PlayerSettings::default();
            let store = Self {
                path,
                data: RwLock::new(defaults.clone()),
            };
            store.persist(&defaults)?;
            return Ok(store);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let data = serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring malformed settings in {}: {}", path.display(), err);
            PlayerSettings::default()
        });

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Result<PlayerSettings> {
        self.data
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    /// Stores a clamped range and returns what was applied.
    pub fn update_range(&self, min: u8, max: u8) -> Result<StrokeRange> {
        let range = StrokeRange::clamped(min, max);
        self.update(|settings| {
            settings.stroke_min = range.min;
            settings.stroke_max = range.max;
        })?;
        Ok(range)
    }

    pub fn update_slow_mode(&self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.slow_mode = enabled)
    }

    pub fn update(&self, apply: impl FnOnce(&mut PlayerSettings)) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        apply(&mut guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &PlayerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
