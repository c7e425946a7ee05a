//! Game settings
//!
//! Loaded from a JSON file by the host. Every field has a default, so a
//! partial file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum particles retained by the memory governor
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 200,
            QualityPreset::High => 400,
        }
    }
}

/// Runtime settings for a simulation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Playfield width in canvas pixels
    pub playfield_width: f32,
    /// Playfield height in canvas pixels
    pub playfield_height: f32,
    /// Quality preset (particle budget)
    pub quality: QualityPreset,
    /// Particle effects (stars, combo bursts)
    pub particles: bool,
    /// Soft per-tick budget; overruns are logged, never throttled
    pub frame_budget_ms: f32,
    /// Ticks between memory governor passes
    pub governor_interval_ticks: u64,
    /// RNG seed (None = pick one at startup)
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            playfield_width: DEFAULT_WIDTH,
            playfield_height: DEFAULT_HEIGHT,
            quality: QualityPreset::Medium,
            particles: true,
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            governor_interval_ticks: DEFAULT_GOVERNOR_INTERVAL,
            seed: None,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Read settings from a JSON file
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load(path: impl AsRef<Path>) -> Self {
        match Self::read(path.as_ref()) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.as_ref().display());
                settings
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Clamp values a hand-edited file could get wrong
    pub(crate) fn sanitize(&mut self) {
        if !(self.playfield_width.is_finite() && self.playfield_width >= 200.0) {
            self.playfield_width = DEFAULT_WIDTH;
        }
        if !(self.playfield_height.is_finite() && self.playfield_height >= 200.0) {
            self.playfield_height = DEFAULT_HEIGHT;
        }
        if !(self.frame_budget_ms.is_finite() && self.frame_budget_ms > 0.0) {
            self.frame_budget_ms = DEFAULT_FRAME_BUDGET_MS;
        }
        self.governor_interval_ticks = self.governor_interval_ticks.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "quality": "High", "seed": 7 }"#).unwrap();
        assert_eq!(settings.quality, QualityPreset::High);
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.playfield_width, DEFAULT_WIDTH);
        assert_eq!(settings.max_particles(), 400);
    }

    #[test]
    fn test_particles_disabled_caps_at_zero() {
        let settings = Settings {
            particles: false,
            ..Settings::default()
        };
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_sanitize_rejects_degenerate_values() {
        let settings = Settings::from_json(
            r#"{ "playfield_width": 0.0, "frame_budget_ms": -1.0, "governor_interval_ticks": 0 }"#,
        )
        .unwrap();
        assert_eq!(settings.playfield_width, DEFAULT_WIDTH);
        assert_eq!(settings.frame_budget_ms, DEFAULT_FRAME_BUDGET_MS);
        assert_eq!(settings.governor_interval_ticks, 1);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let settings = Settings::load("/definitely/not/here.json");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_preset_names_roundtrip() {
        for preset in [QualityPreset::Low, QualityPreset::Medium, QualityPreset::High] {
            assert_eq!(QualityPreset::from_str(preset.as_str()), Some(preset));
        }
    }
}
