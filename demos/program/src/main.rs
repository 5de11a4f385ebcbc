//! `program` — set the Si570 output frequency of a KCU1500 gateway.
//!
//! ```text
//! program --frequency 100                       Program the board at the default device
//! program --frequency 100 --config board.json   Use a JSON board description
//! program --frequency 100 --simulate            Run against the software model
//! ```

use anyhow::{Result, bail};
use clap::Parser;
use libsi570_rs::sim::SimulatedSi570;
use libsi570_rs::{BoardConfig, Kcu1500I2c, ReadMode};
use std::path::PathBuf;

/// Crystal frequency of the simulated part, in MHz.
const SIM_FXTAL_MHZ: f64 = 114.285;

#[derive(Parser)]
#[command(name = "program", about = "Si570 frequency programmer", version)]
struct Cli {
    /// Output frequency in MHz.
    #[arg(short, long)]
    frequency: f64,
    /// JSON board description, defaults to the KCU1500 layout.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Character device to open instead of the configured one.
    #[arg(short, long)]
    device: Option<PathBuf>,
    /// Program a simulated Si570 instead of hardware.
    #[arg(long)]
    simulate: bool,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if !cli.frequency.is_finite() || cli.frequency <= 0.0 {
        bail!("frequency must be a positive number of MHz");
    }

    let mut config = match &cli.config {
        Some(path) => BoardConfig::from_json_file(path)?,
        None => BoardConfig::default(),
    };
    if let Some(device) = cli.device {
        config.device_path = device;
    }

    if cli.simulate {
        let sim = SimulatedSi570::factory(
            config.si570_base(),
            SIM_FXTAL_MHZ,
            config.si570.factory_frequency_mhz,
        )?;
        let mut board = Kcu1500I2c::new(sim.clone(), &config)?;
        board.program_si570(cli.frequency)?;
        report(&mut board)?;
        log::info!(
            "Simulated output: {:.6} MHz",
            sim.output_frequency().unwrap_or_default()
        );
    } else {
        log::info!("Opening {}", config.device_path.display());
        let mut board = Kcu1500I2c::open(&config)?;
        board.program_si570(cli.frequency)?;
        report(&mut board)?;
    }
    Ok(())
}

fn report<B: libsi570_rs::Bus + Clone>(board: &mut Kcu1500I2c<B>) -> Result<()> {
    let si570 = board.si570();
    si570.refresh()?;
    let n1 = si570.n1(ReadMode::Cached)?;
    let hs_div = si570.hs_div(ReadMode::Cached)?;
    let rfreq = si570.rfreq(ReadMode::Cached)?;
    log::info!("N1={n1} HS_DIV={hs_div} RFREQ={rfreq:.9}");
    Ok(())
}
