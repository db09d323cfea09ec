use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epd_7in5_v2::{Device, FrameBuffer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod fonts;
mod layout;
mod readings;
mod schedule;

use config::AppConfig;
use fonts::Fonts;
use readings::Readings;

/// Renders indoor and forecast readings onto a 7.5" e-Paper panel
#[derive(Parser, Debug)]
#[command(name = "weather-display")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Panel wiring configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Draw the readings and refresh the panel
    Show {
        /// Readings file (JSON)
        #[arg(long)]
        readings: PathBuf,
    },
    /// Render the readings to a PBM image without touching the panel
    Preview {
        /// Readings file (JSON)
        #[arg(long)]
        readings: PathBuf,

        /// Output image
        #[arg(long)]
        out: PathBuf,
    },
    /// Blank the panel and put it to sleep
    Clear {
        /// Clear to black instead of white
        #[arg(long)]
        black: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show { readings } => show(&config, &readings),
        Commands::Preview { readings, out } => preview(&config, &readings, &out),
        Commands::Clear { black } => clear(&config, black),
    }
}

fn open_device(config: &AppConfig) -> Result<Device> {
    Device::new(config.device_config()?).context("Failed to open e-Paper device")
}

fn show(config: &AppConfig, readings_path: &Path) -> Result<()> {
    let readings = Readings::load(readings_path)?;
    let mut device = open_device(config)?;

    let dark = readings.is_dark();
    log::info!(
        "Next refresh in {}s",
        schedule::until_next_refresh(readings.timestamp, dark).as_secs()
    );

    if dark {
        log::info!("Not enough light, blanking the panel");
        return blank(&mut device, false);
    }

    device.display.clear_frame();
    let rendered = layout::render(&mut device.display.canvas(), &readings, &Fonts::new());
    if let Err(e) = rendered {
        log::warn!("Render failed, blanking the panel: {e:#}");
        return blank(&mut device, false);
    }

    if let Err(e) = refresh(&mut device) {
        log::warn!("Panel update failed, blanking the panel: {e:#}");
        let _ = blank(&mut device, false);
        return Err(e);
    }
    log::info!("Panel updated");
    Ok(())
}

fn refresh(device: &mut Device) -> Result<()> {
    device.display.initialize()?;
    device.display.update()?;
    device.sleep()?;
    Ok(())
}

fn preview(config: &AppConfig, readings_path: &Path, out: &Path) -> Result<()> {
    let readings = Readings::load(readings_path)?;
    let mut buffer = FrameBuffer::new();
    layout::render(
        &mut buffer.canvas(config.rotation()?),
        &readings,
        &Fonts::new(),
    )?;

    let file = File::create(out)
        .with_context(|| format!("Failed to create preview image: {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    buffer.write_pbm(&mut writer)?;
    writer.flush()?;

    println!("Preview written to {}", out.display());
    Ok(())
}

fn clear(config: &AppConfig, black: bool) -> Result<()> {
    let mut device = open_device(config)?;
    blank(&mut device, black)
}

/// Clears the panel and sleeps it. On failure the panel is still forced
/// down so it is never left powered.
fn blank(device: &mut Device, black: bool) -> Result<()> {
    let cleared = clear_and_sleep(device, black);
    if let Err(e) = &cleared {
        log::warn!("Blanking failed, forcing power down: {e:#}");
        if let Err(e) = device.power_down() {
            log::error!("Forced power down failed: {e}");
        }
    }
    cleared
}

fn clear_and_sleep(device: &mut Device, black: bool) -> Result<()> {
    device.display.initialize()?;
    if black {
        device.display.clear_to_black()?;
    } else {
        device.display.clear_to_white()?;
    }
    device.sleep()?;
    Ok(())
}
