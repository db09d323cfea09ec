//! Recording fakes for the serial bus and control lines.
//!
//! All fakes share one [`Wire`] so tests can assert on the exact byte stream
//! the controller would have seen, split into command and data bytes by the
//! level of the data/command line at the time of the write.

#![allow(dead_code)]

use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use epd_7in5_v2::{Epd7in5v2, Interface};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Command(u8),
    Data(u8),
}

#[derive(Debug, Default)]
pub struct Wire {
    pub events: Vec<Event>,
    pub dc_high: bool,
    pub cs_low: bool,
    pub rst_high: bool,
    /// Every level written to the reset line, in order.
    pub rst_levels: Vec<bool>,
    /// Bytes clocked while chip-select was deasserted.
    pub unframed_bytes: usize,
    /// Busy readings served before falling back to `stuck_busy`.
    pub busy_script: VecDeque<bool>,
    pub stuck_busy: bool,
    pub delayed_ns: u64,
}

impl Wire {
    pub fn commands(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Command(c) => Some(*c),
                Event::Data(_) => None,
            })
            .collect()
    }

    /// Data bytes following the last occurrence of `command`.
    pub fn data_after(&self, command: u8) -> Vec<u8> {
        let Some(start) = self
            .events
            .iter()
            .rposition(|e| *e == Event::Command(command))
        else {
            return Vec::new();
        };
        self.events[start + 1..]
            .iter()
            .map_while(|event| match event {
                Event::Data(d) => Some(*d),
                Event::Command(_) => None,
            })
            .collect()
    }

    pub fn delayed_ms(&self) -> u64 {
        self.delayed_ns / 1_000_000
    }
}

pub type Shared = Rc<RefCell<Wire>>;

pub struct FakeSpi(Shared);

impl spi::ErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiBus for FakeSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut wire = self.0.borrow_mut();
        for &byte in words {
            if !wire.cs_low {
                wire.unframed_bytes += 1;
            }
            let event = if wire.dc_high {
                Event::Data(byte)
            } else {
                Event::Command(byte)
            };
            wire.events.push(event);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        read.fill(0);
        self.write(write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let copy = words.to_vec();
        words.fill(0);
        self.write(&copy)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Line {
    ChipSelect,
    DataCommand,
    Reset,
}

pub struct FakePin {
    wire: Shared,
    line: Line,
}

impl FakePin {
    fn drive(&mut self, high: bool) {
        let mut wire = self.wire.borrow_mut();
        match self.line {
            Line::ChipSelect => wire.cs_low = !high,
            Line::DataCommand => wire.dc_high = high,
            Line::Reset => {
                wire.rst_high = high;
                wire.rst_levels.push(high);
            }
        }
    }
}

impl digital::ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

pub struct FakeBusy(Shared);

impl digital::ErrorType for FakeBusy {
    type Error = Infallible;
}

impl InputPin for FakeBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut wire = self.0.borrow_mut();
        let stuck = wire.stuck_busy;
        Ok(wire.busy_script.pop_front().unwrap_or(stuck))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|busy| !busy)
    }
}

pub struct FakeDelay(Shared);

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delayed_ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().delayed_ns += u64::from(us) * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().delayed_ns += u64::from(ms) * 1_000_000;
    }
}

pub type FakeEpd = Epd7in5v2<FakeSpi, FakePin, FakePin, FakePin, FakeBusy, FakeDelay>;

pub fn fake_interface() -> (
    Interface<FakeSpi, FakePin, FakePin, FakePin, FakeBusy, FakeDelay>,
    Shared,
) {
    let wire: Shared = Rc::new(RefCell::new(Wire::default()));
    let pin = |line| FakePin {
        wire: wire.clone(),
        line,
    };
    let interface = Interface::new(
        FakeSpi(wire.clone()),
        pin(Line::ChipSelect),
        pin(Line::DataCommand),
        pin(Line::Reset),
        FakeBusy(wire.clone()),
        FakeDelay(wire.clone()),
    );
    (interface, wire)
}

pub fn fake_epd() -> (FakeEpd, Shared) {
    let (interface, wire) = fake_interface();
    (Epd7in5v2::new(interface), wire)
}

pub fn fake_epd_with_timeout(timeout: Duration, poll_interval: Duration) -> (FakeEpd, Shared) {
    let (interface, wire) = fake_interface();
    let interface = interface.with_busy_timeout(timeout, poll_interval);
    (Epd7in5v2::new(interface), wire)
}

/// Builds a bottom-up 1 bpp BMP with a two-entry palette and the two byte
/// trailer the panel asset pipeline appends.
pub fn encode_bmp(width: u32, height: u32, pixel: impl Fn(u32, u32) -> bool) -> Vec<u8> {
    let line_width = width.div_ceil(32) as usize * 4;
    let data_offset = 14 + 40 + 8;
    let file_size = data_offset + line_width * height as usize + 2;

    let mut out = Vec::with_capacity(file_size);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(data_offset as u32).to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&[0; 24]);
    out.extend_from_slice(&[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0]);
    for y in (0..height).rev() {
        let mut row = vec![0u8; line_width];
        for x in 0..width {
            if pixel(x, y) {
                row[(x / 8) as usize] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(&row);
    }
    out.extend_from_slice(&[0, 0]);
    out
}
