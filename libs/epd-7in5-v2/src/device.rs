use crate::common::Rotation;
use crate::display::Display;
use crate::display_driver::Epd7in5v2;
pub use crate::error::{EpdResult, Error};
use crate::transport::{DEFAULT_BUSY_POLL_INTERVAL, DEFAULT_BUSY_TIMEOUT, Interface};
use embedded_hal::digital::{ErrorType, OutputPin};
use linux_embedded_hal::{
    CdevPin, CdevPinError, Delay, SpidevBus,
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
};
use log::{debug, info};
use std::time::Duration;

// Waveshare 7.5" HAT wiring on a Raspberry Pi header.
const SPI_PATH: &str = "/dev/spidev0.0";
const SPI_MAX_SPEED_HZ: u32 = 8_000_000;
const GPIO_CHIP: &str = "/dev/gpiochip0";
const BUSY_LINE: u32 = 24;
const DC_LINE: u32 = 25;
const RST_LINE: u32 = 17;

/// Chip-select line: a GPIO driven per byte, or the spidev driver's own.
pub enum ChipSelect {
    Gpio(CdevPin),
    Kernel,
}

impl ErrorType for ChipSelect {
    type Error = CdevPinError;
}

impl OutputPin for ChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        match self {
            ChipSelect::Gpio(pin) => pin.set_low(),
            ChipSelect::Kernel => Ok(()),
        }
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        match self {
            ChipSelect::Gpio(pin) => pin.set_high(),
            ChipSelect::Kernel => Ok(()),
        }
    }
}

pub type LinuxDisplay = Display<SpidevBus, ChipSelect, CdevPin, CdevPin, CdevPin, Delay>;

/// Where the panel is wired. Unset fields fall back to the HAT defaults.
#[derive(Default)]
pub struct DeviceConfig {
    pub spi_path: Option<String>,
    pub spi_options: Option<SpidevOptions>,
    pub gpio_chip: Option<String>,
    /// Line offsets on `gpio_chip`.
    pub busy_line: Option<u32>,
    pub dc_line: Option<u32>,
    pub rst_line: Option<u32>,
    /// Drive this line as chip-select. `None` leaves it to spidev.
    pub cs_line: Option<u32>,
    pub rotation: Option<Rotation>,
    pub busy_timeout: Option<Duration>,
    pub busy_poll_interval: Option<Duration>,
}

fn default_spi_options() -> SpidevOptions {
    SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(SPI_MAX_SPEED_HZ)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build()
}

fn request_line(
    chip: &mut Chip,
    offset: u32,
    flags: LineRequestFlags,
    initial: u8,
    consumer: &str,
) -> EpdResult<CdevPin> {
    let handle = chip.get_line(offset)?.request(flags, initial, consumer)?;
    debug!("EPD: claimed line {offset} as {consumer}");
    Ok(CdevPin::new(handle)?)
}

pub struct Device {
    pub display: LinuxDisplay,
}

impl Device {
    /// Opens the bus and claims the control lines. The panel itself is not
    /// touched until [`Display::initialize`].
    pub fn new(config: DeviceConfig) -> EpdResult<Self> {
        let spi_path = config.spi_path.as_deref().unwrap_or(SPI_PATH);
        let gpio_chip = config.gpio_chip.as_deref().unwrap_or(GPIO_CHIP);
        info!("Opening EPD on {spi_path} with lines from {gpio_chip}");

        let mut spi = SpidevBus::open(spi_path)?;
        spi.configure(&config.spi_options.unwrap_or_else(default_spi_options))?;

        let mut chip = Chip::new(gpio_chip)?;
        let busy = request_line(
            &mut chip,
            config.busy_line.unwrap_or(BUSY_LINE),
            LineRequestFlags::INPUT,
            0,
            "epd-busy",
        )?;
        let dc = request_line(
            &mut chip,
            config.dc_line.unwrap_or(DC_LINE),
            LineRequestFlags::OUTPUT,
            0,
            "epd-dc",
        )?;
        let rst = request_line(
            &mut chip,
            config.rst_line.unwrap_or(RST_LINE),
            LineRequestFlags::OUTPUT,
            0,
            "epd-rst",
        )?;
        // Chip-select idles high.
        let cs = match config.cs_line {
            Some(line) => ChipSelect::Gpio(request_line(
                &mut chip,
                line,
                LineRequestFlags::OUTPUT,
                1,
                "epd-cs",
            )?),
            None => ChipSelect::Kernel,
        };

        let interface = Interface::new(spi, cs, dc, rst, busy, Delay {}).with_busy_timeout(
            config.busy_timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT),
            config
                .busy_poll_interval
                .unwrap_or(DEFAULT_BUSY_POLL_INTERVAL),
        );
        let display = Display::new(
            Epd7in5v2::new(interface),
            config.rotation.unwrap_or_default(),
        );

        Ok(Self { display })
    }

    /// Puts the panel into deep sleep and parks its control lines.
    pub fn sleep(&mut self) -> EpdResult<()> {
        self.display.sleep()
    }

    /// Best-effort teardown after a failed refresh or sleep.
    pub fn power_down(&mut self) -> EpdResult<()> {
        self.display.power_down()
    }

    /// Re-runs the power-on sequence after [`Device::sleep`].
    pub fn wake(&mut self) -> EpdResult<()> {
        self.display.initialize()
    }
}
