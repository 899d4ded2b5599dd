//! Persistent settings for the viewer.

use crate::api::DEFAULT_API_BASE;
use crate::graph::ForceLayout;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which canvas the main panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tab {
    #[default]
    CausalGraph,
    Agents,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::CausalGraph => "Causal Graph",
            Tab::Agents => "Agents",
        }
    }
}

/// Command-line values that apply to this session only
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub prediction_id: Option<String>,
    pub api_url: Option<String>,
    pub offline: bool,
    pub seed: Option<u64>,
}

/// Where this session loads its data from
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub api_url: String,
    pub prediction_id: Option<String>,
    pub offline: bool,
    pub seed: u64,
}

/// Tunable force layout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub collision_padding: f32,
    pub centering: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub drag_alpha_target: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let layout = ForceLayout::default();
        Self {
            link_distance: layout.link_distance,
            charge_strength: layout.charge_strength,
            collision_padding: layout.collision_padding,
            centering: layout.centering,
            velocity_decay: layout.velocity_decay,
            alpha_min: layout.alpha_min,
            alpha_decay: layout.alpha_decay,
            drag_alpha_target: layout.drag_alpha_target,
        }
    }
}

/// All persistable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Data source
    pub api_url: String,
    pub prediction_id: Option<String>,
    pub offline: bool,
    /// Seed for demo data and agent wandering
    pub seed: u64,

    // Display
    pub tab: Tab,
    pub show_labels: bool,
    pub show_arrows: bool,

    // Playback
    pub speed: u32,

    // Physics
    pub layout: LayoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_BASE.to_string(),
            prediction_id: None,
            offline: false,
            seed: 42,
            tab: Tab::CausalGraph,
            show_labels: true,
            show_arrows: true,
            speed: 1,
            layout: LayoutSettings::default(),
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("foresight-viz");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, returning defaults if the file is missing or invalid
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("{}, using default settings", SettingsError::NoConfigDir);
            return Self::default();
        };
        if !path.exists() {
            debug!(?path, "no settings file yet");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                info!(?path, "loaded settings");
                settings
            }
            Err(e) => {
                warn!("{e}, using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings.sanitized())
    }

    /// Save settings to disk, logging any failure
    pub fn save(&self) {
        let result = Self::config_path()
            .ok_or(SettingsError::NoConfigDir)
            .and_then(|path| self.save_to(&path).map(|()| path));
        match result {
            Ok(path) => debug!(?path, "saved settings"),
            Err(e) => warn!("settings not saved: {e}"),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Clamp hand-edited values back into workable ranges
    fn sanitized(mut self) -> Self {
        let l = &mut self.layout;
        l.link_distance = l.link_distance.clamp(10.0, 1000.0);
        l.charge_strength = l.charge_strength.clamp(0.0, 5000.0);
        l.collision_padding = l.collision_padding.clamp(0.0, 100.0);
        l.centering = l.centering.clamp(0.0, 1.0);
        l.velocity_decay = l.velocity_decay.clamp(0.0, 1.0);
        l.alpha_min = l.alpha_min.clamp(1e-5, 0.5);
        l.alpha_decay = l.alpha_decay.clamp(1e-4, 1.0);
        l.drag_alpha_target = l.drag_alpha_target.clamp(0.0, 1.0);
        self.speed = self.speed.clamp(1, 10);
        self
    }

    /// Data source after applying command-line overrides
    pub fn source(&self, overrides: &Overrides) -> SourceConfig {
        SourceConfig {
            api_url: overrides.api_url.clone().unwrap_or_else(|| self.api_url.clone()),
            prediction_id: overrides
                .prediction_id
                .clone()
                .or_else(|| self.prediction_id.clone()),
            offline: overrides.offline || self.offline,
            seed: overrides.seed.unwrap_or(self.seed),
        }
    }

    /// Force layout configured from these settings
    pub fn force_layout(&self) -> ForceLayout {
        let l = &self.layout;
        ForceLayout {
            link_distance: l.link_distance,
            charge_strength: l.charge_strength,
            collision_padding: l.collision_padding,
            centering: l.centering,
            velocity_decay: l.velocity_decay,
            alpha_min: l.alpha_min,
            alpha_decay: l.alpha_decay,
            drag_alpha_target: l.drag_alpha_target,
            ..ForceLayout::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("foresight-viz-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = temp_path("roundtrip/settings.json");
        let mut settings = Settings::default();
        settings.prediction_id = Some("pred-7".into());
        settings.tab = Tab::Agents;
        settings.layout.link_distance = 200.0;

        settings.save_to(&path).expect("save");
        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let path = temp_path("partial.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        std::fs::write(&path, r#"{"seed": 7, "layout": {"charge_strength": 500.0}}"#).expect("write");

        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.layout.charge_strength, 500.0);
        assert_eq!(loaded.layout.link_distance, 120.0);
        assert_eq!(loaded.api_url, DEFAULT_API_BASE);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let path = temp_path("clamped.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        std::fs::write(&path, r#"{"speed": 99, "layout": {"velocity_decay": 3.0}}"#).expect("write");

        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded.speed, 10);
        assert_eq!(loaded.layout.velocity_decay, 1.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let path = temp_path("broken.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Parse(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_path("does-not-exist.json");
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Io { .. })));
    }

    #[test]
    fn overrides_win_over_settings() {
        let mut settings = Settings::default();
        settings.prediction_id = Some("saved".into());
        let overrides = Overrides {
            prediction_id: Some("cli".into()),
            offline: true,
            ..Default::default()
        };
        let source = settings.source(&overrides);
        assert_eq!(source.prediction_id.as_deref(), Some("cli"));
        assert!(source.offline);
        assert_eq!(source.seed, 42);
        assert_eq!(source.api_url, DEFAULT_API_BASE);

        let source = settings.source(&Overrides::default());
        assert_eq!(source.prediction_id.as_deref(), Some("saved"));
        assert!(!source.offline);
    }

    #[test]
    fn layout_follows_settings() {
        let mut settings = Settings::default();
        settings.layout.link_distance = 80.0;
        let layout = settings.force_layout();
        assert_eq!(layout.link_distance, 80.0);
        assert_eq!(layout.theta, ForceLayout::default().theta);
    }
}
