use crate::buffer::FrameBuffer;
use crate::canvas::Canvas;
use crate::common::Rotation;
use crate::display_driver::{Epd7in5v2, PowerState};
use crate::error::EpdResult;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

/// Panel driver paired with the frame it shows.
///
/// The rotation is fixed at construction so every canvas handed out draws
/// with the same transform.
pub struct Display<SPI, CS, DC, RST, BUSY, D> {
    driver: Epd7in5v2<SPI, CS, DC, RST, BUSY, D>,
    buffer: FrameBuffer,
    rotation: Rotation,
}

impl<SPI, CS, DC, RST, BUSY, D> Display<SPI, CS, DC, RST, BUSY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    #[must_use]
    pub fn new(driver: Epd7in5v2<SPI, CS, DC, RST, BUSY, D>, rotation: Rotation) -> Self {
        Self {
            driver,
            buffer: FrameBuffer::new(),
            rotation,
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn state(&self) -> PowerState {
        self.driver.state()
    }

    pub fn canvas(&mut self) -> Canvas<'_> {
        self.buffer.canvas(self.rotation)
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Starts a new blank frame. Nothing is sent to the panel.
    pub fn clear_frame(&mut self) {
        self.buffer.clear();
    }

    pub fn initialize(&mut self) -> EpdResult<()> {
        self.driver.initialize()
    }

    /// Sends the current frame and refreshes the panel.
    pub fn update(&mut self) -> EpdResult<()> {
        self.driver.transmit_and_refresh(self.buffer.as_bytes())
    }

    pub fn clear_to_white(&mut self) -> EpdResult<()> {
        self.driver.clear_to_white()
    }

    pub fn clear_to_black(&mut self) -> EpdResult<()> {
        self.driver.clear_to_black()
    }

    pub fn sleep(&mut self) -> EpdResult<()> {
        self.driver.sleep()
    }

    /// Forces the panel down from whatever state a failure left it in.
    pub fn power_down(&mut self) -> EpdResult<()> {
        self.driver.power_down()
    }

    pub fn into_driver(self) -> Epd7in5v2<SPI, CS, DC, RST, BUSY, D> {
        self.driver
    }
}
