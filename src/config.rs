use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::dataline::DEFAULT_COLOR;
use crate::transfer::FrequencyUnit;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "TRACESCOPE_CONFIG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegendPosition {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

/// User preferences. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Points in an automatically ranged Bode response.
    pub bode_points: usize,
    /// Samples in step and impulse responses.
    pub response_samples: usize,
    pub frequency_unit: FrequencyUnit,
    pub plot_count: usize,
    pub default_dataline_color: String,

    // plot cosmetics
    pub label_size: f32,
    pub tick_size: f32,
    pub title_size: f32,
    pub legend_size: f32,
    pub legend_position: LegendPosition,
    pub grid: bool,
    pub margin_x: f32,
    pub margin_y: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bode_points: 1000,
            response_samples: 5000,
            frequency_unit: FrequencyUnit::RadPerSecond,
            plot_count: 2,
            default_dataline_color: DEFAULT_COLOR.to_string(),
            label_size: 12.0,
            tick_size: 10.0,
            title_size: 14.0,
            legend_size: 10.0,
            legend_position: LegendPosition::TopRight,
            grid: true,
            margin_x: 0.05,
            margin_y: 0.05,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        Ok(settings)
    }

    /// Settings from `$TRACESCOPE_CONFIG`, or defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serialising settings")?;
        std::fs::write(path, text).with_context(|| format!("writing settings {}", path.display()))
    }
}
