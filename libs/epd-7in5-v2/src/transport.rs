use crate::error::{EpdResult, Error};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use log::{debug, trace};
use std::time::Duration;

pub(crate) const RESET_HOLD_MS: u32 = 200;
pub(crate) const RESET_PULSE_MS: u32 = 2;
pub const DEFAULT_BUSY_POLL_INTERVAL: Duration = Duration::from_millis(5);
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Byte-level framing over the serial bus and the panel control lines.
///
/// Every `send_*` byte is its own chip-select-bracketed transaction. The busy
/// line is active high.
pub struct Interface<SPI, CS, DC, RST, BUSY, D> {
    spi: SPI,
    cs: CS,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: D,
    busy_timeout: Duration,
    busy_poll_interval: Duration,
}

impl<SPI, CS, DC, RST, BUSY, D> Interface<SPI, CS, DC, RST, BUSY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, cs: CS, dc: DC, rst: RST, busy: BUSY, delay: D) -> Self {
        Self {
            spi,
            cs,
            dc,
            rst,
            busy,
            delay,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            busy_poll_interval: DEFAULT_BUSY_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.busy_timeout = timeout;
        // A zero interval would never accumulate towards the timeout.
        self.busy_poll_interval = poll_interval.max(Duration::from_micros(1));
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn send_command(&mut self, command: u8) -> EpdResult<()> {
        trace!("EPD: command 0x{command:02X}");
        self.dc.set_low().map_err(|e| Error::pin(&e))?;
        self.transfer(command)
    }

    pub fn send_data(&mut self, data: u8) -> EpdResult<()> {
        self.dc.set_high().map_err(|e| Error::pin(&e))?;
        self.transfer(data)
    }

    /// Sends each byte as an independent data transaction.
    pub fn send_data_bytes(&mut self, data: &[u8]) -> EpdResult<()> {
        for &byte in data {
            self.send_data(byte)?;
        }
        trace!("EPD: sent {} bytes of data", data.len());
        Ok(())
    }

    /// Sends `count` copies of `value` as data.
    pub fn send_data_repeated(&mut self, value: u8, count: usize) -> EpdResult<()> {
        for _ in 0..count {
            self.send_data(value)?;
        }
        trace!("EPD: sent {count} x 0x{value:02X}");
        Ok(())
    }

    fn transfer(&mut self, byte: u8) -> EpdResult<()> {
        self.cs.set_low().map_err(|e| Error::pin(&e))?;
        let written = self.spi.write(&[byte]).and_then(|()| self.spi.flush());
        // Release chip-select even when the write failed.
        self.cs.set_high().map_err(|e| Error::pin(&e))?;
        written.map_err(|e| Error::spi(&e))
    }

    pub fn reset(&mut self) -> EpdResult<()> {
        debug!("EPD: Hardware reset starting");
        self.rst.set_high().map_err(|e| Error::pin(&e))?;
        self.delay.delay_ms(RESET_HOLD_MS);
        self.rst.set_low().map_err(|e| Error::pin(&e))?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.rst.set_high().map_err(|e| Error::pin(&e))?;
        self.delay.delay_ms(RESET_HOLD_MS);
        debug!("EPD: Hardware reset complete");
        Ok(())
    }

    /// Polls the busy line until it reads idle.
    ///
    /// Time is accounted as the sum of the poll delays, so the bound holds for
    /// any delay source. Fails with [`Error::ControllerUnresponsive`] once the
    /// configured timeout has been waited.
    pub fn wait_not_busy(&mut self) -> EpdResult<()> {
        let step_us = u32::try_from(self.busy_poll_interval.as_micros()).unwrap_or(u32::MAX);
        let mut waited = Duration::ZERO;

        while self.busy.is_high().map_err(|e| Error::pin(&e))? {
            if waited >= self.busy_timeout {
                let waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
                debug!("EPD: wait_not_busy TIMEOUT after {waited_ms}ms");
                return Err(Error::ControllerUnresponsive { waited_ms });
            }
            self.delay.delay_us(step_us);
            waited += self.busy_poll_interval;
        }

        trace!("EPD: wait_not_busy done in {}ms", waited.as_millis());
        Ok(())
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Drives the control lines to their idle level: reset and data/command
    /// low, chip-select deasserted.
    pub fn park(&mut self) -> EpdResult<()> {
        self.rst.set_low().map_err(|e| Error::pin(&e))?;
        self.dc.set_low().map_err(|e| Error::pin(&e))?;
        self.cs.set_high().map_err(|e| Error::pin(&e))?;
        debug!("EPD: control lines parked");
        Ok(())
    }

    /// Gives the bus and pins back to the caller.
    pub fn release(self) -> (SPI, CS, DC, RST, BUSY, D) {
        (self.spi, self.cs, self.dc, self.rst, self.busy, self.delay)
    }
}
