// Sensor and forecast readings supplied by the collector as JSON.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The indoor sensor reads warm from board heat.
pub const TEMP_COMPENSATION_C: f32 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readings {
    /// Local time the readings were taken
    pub timestamp: NaiveDateTime,

    pub indoor: Indoor,

    /// Ambient light sensor voltage; zero means the room is dark
    #[serde(default)]
    pub light_level: Option<f32>,

    /// Outdoor conditions and forecast, absent when the fetch failed
    #[serde(default)]
    pub outdoor: Option<Outdoor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indoor {
    pub temperature_c: f32,
    pub humidity: f32,
}

/// Outdoor values are shown as given, in the forecast provider's units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outdoor {
    pub temperature: f32,
    pub humidity: f32,

    /// Mean precipitation over the coming hour
    #[serde(default)]
    pub rain: Option<f32>,

    /// Today first
    #[serde(default)]
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub high: f32,
    pub low: f32,

    /// Probability of precipitation, 0.0 to 1.0
    #[serde(default)]
    pub precipitation: f32,
}

impl Readings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read readings file: {}", path.display()))?;

        let readings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse readings file: {}", path.display()))?;

        Ok(readings)
    }

    /// Indoor temperature in whole degrees Fahrenheit after compensation,
    /// truncated toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn indoor_fahrenheit(&self) -> i32 {
        ((self.indoor.temperature_c - TEMP_COMPENSATION_C) * 1.8 + 32.0) as i32
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn indoor_humidity(&self) -> i32 {
        self.indoor.humidity as i32
    }

    pub fn is_dark(&self) -> bool {
        self.light_level.is_some_and(|level| level <= 0.0)
    }
}
