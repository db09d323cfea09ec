// Panel wiring configuration, read from an optional JSON file.
//
// Every field may be omitted; the driver's defaults match the Waveshare HAT on
// a Raspberry Pi.

use anyhow::{Context, Result};
use epd_7in5_v2::{DeviceConfig, Rotation};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const SPI_BITS_PER_WORD: u8 = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// e.g. /dev/spidev0.0
    pub spi_bus_path: Option<String>,
    pub spi_max_speed_hz: Option<u32>,
    /// e.g. /dev/gpiochip0
    pub gpio_chip_path: Option<String>,
    pub busy_pin: Option<u32>,
    pub dc_pin: Option<u32>,
    pub rst_pin: Option<u32>,
    /// GPIO driven as chip-select; omit to let spidev drive its own
    pub cs_pin: Option<u32>,
    /// 0, 90, 180 or 270
    pub rotation: Option<u16>,
    pub busy_timeout_ms: Option<u64>,
    pub busy_poll_interval_ms: Option<u64>,
}

impl AppConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.rotation()?;
        Ok(config)
    }

    pub fn rotation(&self) -> Result<Rotation> {
        match self.rotation {
            None => Ok(Rotation::default()),
            Some(degrees) => Rotation::from_degrees(degrees).with_context(|| {
                format!("Invalid rotation {degrees}: must be 0, 90, 180 or 270")
            }),
        }
    }

    pub fn device_config(&self) -> Result<DeviceConfig> {
        let spi_options = self.spi_max_speed_hz.map(|hz| {
            SpidevOptions::new()
                .bits_per_word(SPI_BITS_PER_WORD)
                .max_speed_hz(hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build()
        });

        Ok(DeviceConfig {
            spi_path: self.spi_bus_path.clone(),
            spi_options,
            gpio_chip: self.gpio_chip_path.clone(),
            busy_line: self.busy_pin,
            dc_line: self.dc_pin,
            rst_line: self.rst_pin,
            cs_line: self.cs_pin,
            rotation: Some(self.rotation()?),
            busy_timeout: self.busy_timeout_ms.map(Duration::from_millis),
            busy_poll_interval: self.busy_poll_interval_ms.map(Duration::from_millis),
        })
    }
}
