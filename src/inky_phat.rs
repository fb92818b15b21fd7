//! # Inky pHAT Panel Driver
//!
//! Driver for the SSD1608-class controller on the Pimoroni Inky pHAT
//! (250×122, black/white plus red or yellow).
//!
//! ## RAM Layout
//!
//! The controller is wired portrait: its 250 gate rows run along the panel's
//! long edge and each row holds 136 source columns (17 bytes), of which the
//! middle 122 are connected. Panel pixel `(x, y)` lands in RAM row `x`,
//! column `127 - y`. Unconnected columns are written as white.
//!
//! Two planes are written per frame:
//! - **black plane** (`0x24`): bit 1 = not black
//! - **color plane** (`0x26`): bit 1 = accent color
//!
//! The driver is generic over `embedded-hal` 1.0 traits so the command
//! sequence can be tested with recording mocks; Linux wiring lives in the
//! binary behind the `hardware` feature.

use crate::compositor::IndexedImage;
use crate::display::{DisplaySink, SinkError};
use crate::palette::{ACCENT_INDEX, FOREGROUND_INDEX};
use crate::{PANEL_HEIGHT, PANEL_WIDTH};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info};

/// Gate rows of the controller RAM
pub const RAM_ROWS: usize = 250;
/// Source columns per RAM row
pub const RAM_COLS: usize = 136;
/// Bytes per RAM row
pub const RAM_ROW_BYTES: usize = RAM_COLS / 8;
/// First connected source column
const COLUMN_OFFSET: usize = 6;

/// Default time to wait for BUSY to clear before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const BUSY_POLL: Duration = Duration::from_millis(10);

struct Cmd;

impl Cmd {
    const DRIVER_OUTPUT_CTRL: u8 = 0x01;
    const DEEP_SLEEP: u8 = 0x10;
    const DATA_ENTRY_MODE: u8 = 0x11;
    const SW_RESET: u8 = 0x12;
    const MASTER_ACTIVATE: u8 = 0x20;
    const DISPLAY_UPDATE_CTRL2: u8 = 0x22;
    const WRITE_BW_DATA: u8 = 0x24;
    const WRITE_COLOR_DATA: u8 = 0x26;
    const WRITE_VCOM_REG: u8 = 0x2C;
    const WRITE_DUMMY_LINE: u8 = 0x3A;
    const WRITE_GATE_LINE: u8 = 0x3B;
    const BORDER_WAVEFORM_CTRL: u8 = 0x3C;
    const SET_RAMXPOS: u8 = 0x44;
    const SET_RAMYPOS: u8 = 0x45;
    const SET_RAMX_COUNTER: u8 = 0x4E;
    const SET_RAMY_COUNTER: u8 = 0x4F;
}

/// Black and color RAM planes for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RamPlanes {
    pub black: Vec<u8>,
    pub color: Vec<u8>,
}

impl RamPlanes {
    /// All-white planes
    pub fn blank() -> Self {
        Self {
            black: vec![0xFF; RAM_ROWS * RAM_ROW_BYTES],
            color: vec![0x00; RAM_ROWS * RAM_ROW_BYTES],
        }
    }

    /// Pack a panel-sized indexed frame into RAM order.
    pub fn from_image(image: &IndexedImage) -> Result<Self, SinkError> {
        if (image.width(), image.height()) != (PANEL_WIDTH, PANEL_HEIGHT) {
            return Err(SinkError::Size {
                expected: (PANEL_WIDTH, PANEL_HEIGHT),
                actual: (image.width(), image.height()),
            });
        }

        let mut planes = Self::blank();
        for y in 0..PANEL_HEIGHT {
            for x in 0..PANEL_WIDTH {
                let row = x as usize;
                let column = COLUMN_OFFSET + (PANEL_HEIGHT - 1 - y) as usize;
                let byte = row * RAM_ROW_BYTES + column / 8;
                let mask = 0x80u8 >> (column % 8);
                match image.index_at(x, y) {
                    Some(FOREGROUND_INDEX) => planes.black[byte] &= !mask,
                    Some(ACCENT_INDEX) => planes.color[byte] |= mask,
                    _ => {}
                }
            }
        }
        Ok(planes)
    }
}

fn hardware<E: Debug>(err: E) -> SinkError {
    SinkError::Hardware(format!("{err:?}"))
}

/// Inky pHAT on an SPI device with DC, RESET and BUSY lines.
pub struct InkyPhat<SPI, DC, RST, BUSY, D> {
    spi: SPI,
    dc: DC,
    reset: RST,
    busy: BUSY,
    delay: D,
    busy_timeout: Duration,
}

impl<SPI, DC, RST, BUSY, D> InkyPhat<SPI, DC, RST, BUSY, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, dc: DC, reset: RST, busy: BUSY, delay: D) -> Self {
        Self {
            spi,
            dc,
            reset,
            busy,
            delay,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn command(&mut self, cmd: u8, data: &[u8]) -> Result<(), SinkError> {
        self.dc.set_low().map_err(hardware)?;
        self.spi.write(&[cmd]).map_err(hardware)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(hardware)?;
            self.spi.write(data).map_err(hardware)?;
        }
        Ok(())
    }

    /// BUSY is active high.
    fn wait_until_idle(&mut self) -> Result<(), SinkError> {
        let mut waited = Duration::ZERO;
        while self.busy.is_high().map_err(hardware)? {
            if waited >= self.busy_timeout {
                return Err(SinkError::BusyTimeout(self.busy_timeout));
            }
            self.delay.delay_ms(BUSY_POLL.as_millis() as u32);
            waited += BUSY_POLL;
        }
        Ok(())
    }

    fn hard_reset(&mut self) -> Result<(), SinkError> {
        self.reset.set_low().map_err(hardware)?;
        self.delay.delay_ms(100);
        self.reset.set_high().map_err(hardware)?;
        self.delay.delay_ms(100);
        self.wait_until_idle()
    }

    fn init(&mut self) -> Result<(), SinkError> {
        debug!("Initializing panel controller");
        self.hard_reset()?;
        self.command(Cmd::SW_RESET, &[])?;
        self.wait_until_idle()?;

        let last_row = (RAM_ROWS - 1) as u16;
        let [row_low, row_high] = last_row.to_le_bytes();
        self.command(Cmd::DRIVER_OUTPUT_CTRL, &[row_low, row_high & 0x01, 0x00])?;
        self.command(Cmd::WRITE_DUMMY_LINE, &[0x1B])?;
        self.command(Cmd::WRITE_GATE_LINE, &[0x0B])?;
        // x then y increment
        self.command(Cmd::DATA_ENTRY_MODE, &[0x03])?;
        self.command(Cmd::SET_RAMXPOS, &[0x00, (RAM_ROW_BYTES - 1) as u8])?;
        self.command(Cmd::SET_RAMYPOS, &[0x00, 0x00, row_low, row_high])?;
        self.command(Cmd::WRITE_VCOM_REG, &[0x70])?;
        // white border
        self.command(Cmd::BORDER_WAVEFORM_CTRL, &[0x31])?;
        self.command(Cmd::SET_RAMX_COUNTER, &[0x00])?;
        self.command(Cmd::SET_RAMY_COUNTER, &[0x00, 0x00])
    }

    /// Write both planes, refresh and put the controller to sleep.
    pub fn show(&mut self, planes: &RamPlanes) -> Result<(), SinkError> {
        self.init()?;
        self.command(Cmd::WRITE_BW_DATA, &planes.black)?;
        self.command(Cmd::WRITE_COLOR_DATA, &planes.color)?;

        // load temperature and waveform from OTP, then refresh
        self.command(Cmd::DISPLAY_UPDATE_CTRL2, &[0xF7])?;
        self.command(Cmd::MASTER_ACTIVATE, &[])?;
        self.wait_until_idle()?;

        self.command(Cmd::DEEP_SLEEP, &[0x01])?;
        self.delay.delay_ms(1);
        Ok(())
    }
}

impl<SPI, DC, RST, BUSY, D> DisplaySink for InkyPhat<SPI, DC, RST, BUSY, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    fn present(&mut self, image: &IndexedImage) -> Result<(), SinkError> {
        let planes = RamPlanes::from_image(image)?;
        info!(
            black = planes.black.iter().map(|b| b.count_zeros()).sum::<u32>(),
            accent = planes.color.iter().map(|b| b.count_ones()).sum::<u32>(),
            "Refreshing panel"
        );
        self.show(&planes)
    }
}
