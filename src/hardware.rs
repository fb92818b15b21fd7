//! Linux wiring for the Inky pHAT: kernel spidev for SPI, the GPIO character
//! device for DC, RESET and BUSY.

use anyhow::Context;
use inky_dashboard_lib::config::HardwareConfig;
use inky_dashboard_lib::inky_phat::InkyPhat;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use std::time::Duration;
use tracing::info;

const CONSUMER: &str = "inky-dashboard";

pub type Panel = InkyPhat<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

fn output_pin(chip: &mut Chip, offset: u32) -> anyhow::Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .with_context(|| format!("get GPIO line {offset}"))?
        .request(LineRequestFlags::OUTPUT, 1, CONSUMER)
        .with_context(|| format!("request GPIO {offset} as output"))?;
    CdevPin::new(handle).with_context(|| format!("wrap GPIO {offset}"))
}

fn input_pin(chip: &mut Chip, offset: u32) -> anyhow::Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .with_context(|| format!("get GPIO line {offset}"))?
        .request(LineRequestFlags::INPUT, 0, CONSUMER)
        .with_context(|| format!("request GPIO {offset} as input"))?;
    CdevPin::new(handle).with_context(|| format!("wrap GPIO {offset}"))
}

/// Open SPI and GPIO lines for the panel.
pub fn open_panel(hw: &HardwareConfig) -> anyhow::Result<Panel> {
    info!(
        spi = %hw.spi_path.display(),
        gpio_chip = %hw.gpio_chip.display(),
        dc = hw.dc_pin,
        reset = hw.reset_pin,
        busy = hw.busy_pin,
        "Opening Inky pHAT"
    );

    let mut spi = SpidevDevice::open(&hw.spi_path)
        .with_context(|| format!("open {}", hw.spi_path.display()))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(488_000)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options).context("configure spidev")?;

    let mut chip = Chip::new(&hw.gpio_chip)
        .with_context(|| format!("open {}", hw.gpio_chip.display()))?;
    let dc = output_pin(&mut chip, hw.dc_pin)?;
    let reset = output_pin(&mut chip, hw.reset_pin)?;
    let busy = input_pin(&mut chip, hw.busy_pin)?;

    Ok(InkyPhat::new(spi, dc, reset, busy, Delay)
        .with_busy_timeout(Duration::from_secs(hw.busy_timeout_seconds)))
}
