use crate::display_driver::PowerState;
use core::convert::Infallible;
use embedded_hal::{digital, spi};
use linux_embedded_hal::CdevPinError;
use linux_embedded_hal::SPIError;
use linux_embedded_hal::gpio_cdev::Error as GpioError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Controller unresponsive: busy line still set after {waited_ms}ms")]
    ControllerUnresponsive { waited_ms: u64 },
    #[error("{operation} is not allowed while the controller is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: PowerState,
    },
    #[error("Frame buffer must be {expected} bytes, got {actual}")]
    BufferLength { expected: usize, actual: usize },
    #[error("SPI error: {0:?}")]
    Spi(spi::ErrorKind),
    #[error("SPI device error: {0}")]
    SpiDev(#[from] SPIError),
    #[error("Pin error: {0:?}")]
    Pin(digital::ErrorKind),
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
    #[error("Cdev pin error: {0}")]
    CdevPin(#[from] CdevPinError),
    #[error("Malformed bitmap: {0}")]
    MalformedBitmap(String),
    #[error("Unsupported bitmap: {0}")]
    UnsupportedBitmap(String),
    #[error("Malformed font: {0}")]
    MalformedFont(String),
}

impl Error {
    pub(crate) fn spi<E: spi::Error>(e: &E) -> Self {
        Error::Spi(e.kind())
    }

    pub(crate) fn pin<E: digital::Error>(e: &E) -> Self {
        Error::Pin(e.kind())
    }
}

// Lets canvas drawing, which cannot fail, use `?` alongside panel I/O.
impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type EpdResult<T> = Result<T, Error>;
