/// This module has been created using mod.rs in a subfolder, instead of just creating a common.rs under tests
/// This is due to the test runner then not searching for runnable tests in mod.rs
/// https://doc.rust-lang.org/rust-by-example/testing/integration_testing.html
use libsi570_rs::sim::{Access, SimulatedSi570};
use libsi570_rs::kcu1500::{KCU1500_I2C_BASE, KCU1500_SI570_FACTORY_MHZ, KCU1500_SI570_OFFSET};
use libsi570_rs::{ProgrammerConfig, SI570, SI570_ADDR_SIZE};

#[allow(dead_code)]
pub const SI570_BASE: u64 = KCU1500_I2C_BASE + KCU1500_SI570_OFFSET;
#[allow(dead_code)]
pub const FXTAL_MHZ: f64 = 114.285;

pub fn logging_init(module: &str) {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Error)
        .filter_module(module, log::LevelFilter::Trace)
        .try_init();
}

/// Defaults without the poll sleep.
#[allow(dead_code)]
pub fn fast_config() -> ProgrammerConfig {
    ProgrammerConfig {
        reset_poll_interval_ms: 0,
        ..ProgrammerConfig::default()
    }
}

/// A factory programmed simulated part and a driver on top of it.
#[allow(dead_code)]
pub fn factory_device() -> (SimulatedSi570, SI570<SimulatedSi570>) {
    let sim = SimulatedSi570::factory(SI570_BASE, FXTAL_MHZ, KCU1500_SI570_FACTORY_MHZ).unwrap();
    let si570 = SI570::new(sim.clone(), SI570_BASE, fast_config()).unwrap();
    (sim, si570)
}

/// Register number and direction of every Si570 access, other addresses skipped.
#[allow(dead_code)]
pub fn register_trace(sim: &SimulatedSi570) -> Vec<(char, u8)> {
    sim.accesses()
        .into_iter()
        .filter_map(|access| {
            let (kind, addr) = match access {
                Access::Read { addr, .. } => ('R', addr),
                Access::Write { addr, .. } => ('W', addr),
            };
            let offset = addr.checked_sub(SI570_BASE)?;
            Some((kind, (offset / SI570_ADDR_SIZE) as u8))
        })
        .collect()
}

/// Values written to Si570 register `register`, in order.
#[allow(dead_code)]
pub fn writes_to(sim: &SimulatedSi570, register: u8) -> Vec<u8> {
    let addr = sim.register_addr(register);
    sim.accesses()
        .into_iter()
        .filter_map(|access| match access {
            Access::Write { addr: a, value } if a == addr => Some(value as u8),
            _ => None,
        })
        .collect()
}
