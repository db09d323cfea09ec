use crate::common::BUFFER_SIZE;
use crate::error::{EpdResult, Error};
use crate::transport::Interface;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use log::{debug, info, warn};

pub(crate) const POWER_ON_DELAY_MS: u32 = 100;
pub(crate) const REFRESH_DELAY_MS: u32 = 100;
pub(crate) const DEEP_SLEEP_DELAY_MS: u32 = 2000;
pub const LUT_LEN: usize = 42;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    Uninitialized,
    Reset,
    Initialized,
    Transmitting,
    Refreshing,
    Sleeping,
    PoweredDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EpdCommand {
    PanelSetting = 0x00,
    PowerSetting = 0x01,
    PowerOff = 0x02,
    PowerOn = 0x04,
    BoosterSoftStart = 0x06,
    DeepSleep = 0x07,
    DataTransmission1 = 0x10,
    DisplayRefresh = 0x12,
    DataTransmission2 = 0x13,
    DualSpiMode = 0x15,
    LutVcom = 0x20,
    LutWw = 0x21,
    LutBw = 0x22,
    LutWb = 0x23,
    LutBb = 0x24,
    PllControl = 0x30,
    VcomDataInterval = 0x50,
    TconSetting = 0x60,
    ResolutionSetting = 0x61,
    GateSourceStart = 0x65,
    VcomDc = 0x82,
}

/// Voltage frame: PLL, VSH, VSL, VSHR, VCOM, (unused), VGH/VGL.
const VOLTAGE_FRAME: [u8; 7] = [0x06, 0x3F, 0x3F, 0x11, 0x24, 0x07, 0x17];

const LUT_VCOM: [u8; LUT_LEN] = [
    0x00, 0x0F, 0x0F, 0x00, 0x00, 0x01, //
    0x00, 0x0F, 0x01, 0x0F, 0x01, 0x02, //
    0x00, 0x0F, 0x0F, 0x00, 0x00, 0x01, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const LUT_WW: [u8; LUT_LEN] = [
    0x10, 0x0F, 0x0F, 0x00, 0x00, 0x01, //
    0x84, 0x0F, 0x01, 0x0F, 0x01, 0x02, //
    0x20, 0x0F, 0x0F, 0x00, 0x00, 0x01, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const LUT_BW: [u8; LUT_LEN] = LUT_WW;

const LUT_WB: [u8; LUT_LEN] = [
    0x80, 0x0F, 0x0F, 0x00, 0x00, 0x01, //
    0x84, 0x0F, 0x01, 0x0F, 0x01, 0x02, //
    0x40, 0x0F, 0x0F, 0x00, 0x00, 0x01, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const LUT_BB: [u8; LUT_LEN] = LUT_WB;

/// Parameter bytes that follow each command.
pub enum EpdData {
    PowerSetting,
    VcomDc,
    BoosterSoftStart,
    PllControl,
    PanelSetting,
    ResolutionSetting,
    DualSpiMode,
    VcomDataInterval,
    TconSetting,
    GateSourceStart,
    LutVcom,
    LutWw,
    LutBw,
    LutWb,
    LutBb,
    DeepSleep,
}

impl EpdData {
    pub(crate) fn as_slice(&self) -> &'static [u8] {
        const POWER_SETTING: [u8; 5] = [
            0x17, // internal power
            VOLTAGE_FRAME[6],
            VOLTAGE_FRAME[1],
            VOLTAGE_FRAME[2],
            VOLTAGE_FRAME[3],
        ];
        const VCOM_DC: [u8; 1] = [VOLTAGE_FRAME[4]];
        const PLL: [u8; 1] = [VOLTAGE_FRAME[0]];

        match self {
            EpdData::PowerSetting => &POWER_SETTING,
            EpdData::VcomDc => &VCOM_DC,
            EpdData::BoosterSoftStart => &[0x27, 0x27, 0x2F, 0x17],
            EpdData::PllControl => &PLL,
            EpdData::PanelSetting => &[0x3F],
            // source 800, gate 480
            EpdData::ResolutionSetting => &[0x03, 0x20, 0x01, 0xE0],
            EpdData::DualSpiMode => &[0x00],
            EpdData::VcomDataInterval => &[0x10, 0x00],
            EpdData::TconSetting => &[0x22],
            EpdData::GateSourceStart => &[0x00, 0x00, 0x00, 0x00],
            EpdData::LutVcom => &LUT_VCOM,
            EpdData::LutWw => &LUT_WW,
            EpdData::LutBw => &LUT_BW,
            EpdData::LutWb => &LUT_WB,
            EpdData::LutBb => &LUT_BB,
            EpdData::DeepSleep => &[0xA5],
        }
    }
}

/// Command sequence sent after power-on, in wire order.
const PANEL_SEQUENCE: [(EpdCommand, EpdData); 11] = [
    (EpdCommand::PanelSetting, EpdData::PanelSetting),
    (EpdCommand::ResolutionSetting, EpdData::ResolutionSetting),
    (EpdCommand::DualSpiMode, EpdData::DualSpiMode),
    (EpdCommand::VcomDataInterval, EpdData::VcomDataInterval),
    (EpdCommand::TconSetting, EpdData::TconSetting),
    (EpdCommand::GateSourceStart, EpdData::GateSourceStart),
    (EpdCommand::LutVcom, EpdData::LutVcom),
    (EpdCommand::LutWw, EpdData::LutWw),
    (EpdCommand::LutBw, EpdData::LutBw),
    (EpdCommand::LutWb, EpdData::LutWb),
    (EpdCommand::LutBb, EpdData::LutBb),
];

// --- EPD Driver ---

pub struct Epd7in5v2<SPI, CS, DC, RST, BUSY, D> {
    interface: Interface<SPI, CS, DC, RST, BUSY, D>,
    state: PowerState,
}

impl<SPI, CS, DC, RST, BUSY, D> Epd7in5v2<SPI, CS, DC, RST, BUSY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    pub fn new(interface: Interface<SPI, CS, DC, RST, BUSY, D>) -> Self {
        Self {
            interface,
            state: PowerState::Uninitialized,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    fn send_command(&mut self, command: EpdCommand, data: Option<&[u8]>) -> EpdResult<()> {
        self.interface.send_command(command as u8)?;
        if let Some(data) = data {
            self.interface.send_data_bytes(data)?;
        }
        Ok(())
    }

    fn require(&self, operation: &'static str, expected: PowerState) -> EpdResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Hardware reset pulse. Legal from any state.
    pub fn reset(&mut self) -> EpdResult<()> {
        self.interface.reset()?;
        self.state = PowerState::Reset;
        Ok(())
    }

    /// Power and panel configuration followed by the five waveform tables.
    ///
    /// Pulses reset first unless the controller was just reset. The order of
    /// the commands is part of the controller contract.
    pub fn initialize(&mut self) -> EpdResult<()> {
        if self.state != PowerState::Reset {
            self.reset()?;
        }
        info!("EPD: initializing controller");

        self.send_command(
            EpdCommand::PowerSetting,
            Some(EpdData::PowerSetting.as_slice()),
        )?;
        self.send_command(EpdCommand::VcomDc, Some(EpdData::VcomDc.as_slice()))?;
        self.send_command(
            EpdCommand::BoosterSoftStart,
            Some(EpdData::BoosterSoftStart.as_slice()),
        )?;
        self.send_command(
            EpdCommand::PllControl,
            Some(EpdData::PllControl.as_slice()),
        )?;

        self.send_command(EpdCommand::PowerOn, None)?;
        self.interface.delay_ms(POWER_ON_DELAY_MS);
        self.interface.wait_not_busy()?;
        debug!("EPD: power on complete");

        for (command, data) in &PANEL_SEQUENCE {
            self.send_command(*command, Some(data.as_slice()))?;
        }

        self.state = PowerState::Initialized;
        info!("EPD: controller initialized");
        Ok(())
    }

    /// Streams a full frame to data-transmission-2 and refreshes the panel.
    ///
    /// A set bit is a black pixel. The buffer length must equal
    /// [`BUFFER_SIZE`]; nothing is sent otherwise.
    pub fn transmit_and_refresh(&mut self, buffer: &[u8]) -> EpdResult<()> {
        self.require("transmit_and_refresh", PowerState::Initialized)?;
        if buffer.len() != BUFFER_SIZE {
            return Err(Error::BufferLength {
                expected: BUFFER_SIZE,
                actual: buffer.len(),
            });
        }
        debug!("EPD: transmitting {} byte frame", buffer.len());

        self.state = PowerState::Transmitting;
        self.send_command(EpdCommand::DataTransmission2, Some(buffer))?;
        self.refresh()
    }

    /// Full-screen white: all ones to data-transmission-1, all zeros to
    /// data-transmission-2.
    pub fn clear_to_white(&mut self) -> EpdResult<()> {
        self.require("clear_to_white", PowerState::Initialized)?;
        debug!("EPD: clearing to white");
        self.fill_planes(0xFF, 0x00)
    }

    /// Full-screen black: the inverse plane values of [`Self::clear_to_white`].
    pub fn clear_to_black(&mut self) -> EpdResult<()> {
        self.require("clear_to_black", PowerState::Initialized)?;
        debug!("EPD: clearing to black");
        self.fill_planes(0x00, 0xFF)
    }

    fn fill_planes(&mut self, old_plane: u8, new_plane: u8) -> EpdResult<()> {
        self.state = PowerState::Transmitting;
        self.send_command(EpdCommand::DataTransmission1, None)?;
        self.interface.send_data_repeated(old_plane, BUFFER_SIZE)?;
        self.send_command(EpdCommand::DataTransmission2, None)?;
        self.interface.send_data_repeated(new_plane, BUFFER_SIZE)?;
        self.refresh()
    }

    fn refresh(&mut self) -> EpdResult<()> {
        self.state = PowerState::Refreshing;
        self.send_command(EpdCommand::DisplayRefresh, None)?;
        self.interface.delay_ms(REFRESH_DELAY_MS);
        self.interface.wait_not_busy()?;
        self.state = PowerState::Initialized;
        debug!("EPD: refresh complete");
        Ok(())
    }

    /// Power off, deep sleep, then park the control lines.
    ///
    /// Only [`Self::reset`] or [`Self::initialize`] are legal afterwards.
    pub fn sleep(&mut self) -> EpdResult<()> {
        self.require("sleep", PowerState::Initialized)?;
        self.state = PowerState::Sleeping;
        self.send_command(EpdCommand::PowerOff, None)?;
        self.interface.wait_not_busy()?;
        self.send_command(EpdCommand::DeepSleep, Some(EpdData::DeepSleep.as_slice()))?;
        self.interface.delay_ms(DEEP_SLEEP_DELAY_MS);
        self.interface.park()?;
        self.state = PowerState::PoweredDown;
        info!("EPD: powered down");
        Ok(())
    }

    /// Shutdown from any state, for use after a failed operation.
    ///
    /// Every step is attempted even when an earlier one fails, and the
    /// control lines are always parked. Returns the first error seen.
    pub fn power_down(&mut self) -> EpdResult<()> {
        if self.state == PowerState::PoweredDown {
            return Ok(());
        }
        warn!("EPD: forcing power down from {:?}", self.state);
        self.state = PowerState::Sleeping;
        let steps = [
            self.send_command(EpdCommand::PowerOff, None),
            self.interface.wait_not_busy(),
            self.send_command(EpdCommand::DeepSleep, Some(EpdData::DeepSleep.as_slice())),
        ];
        self.interface.delay_ms(DEEP_SLEEP_DELAY_MS);
        let parked = self.interface.park();
        self.state = PowerState::PoweredDown;

        match steps.into_iter().chain([parked]).find_map(Result::err) {
            Some(e) => Err(e),
            None => {
                info!("EPD: powered down");
                Ok(())
            }
        }
    }

    /// Consumes the driver and returns the bus and pins.
    pub fn release(self) -> (SPI, CS, DC, RST, BUSY, D) {
        self.interface.release()
    }
}
