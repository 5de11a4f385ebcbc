mod clock;

use crate::Result;
use crate::bus::{Bus, PcieBus};
use crate::config::BoardConfig;
use crate::hardware::i2c_mux::I2cMux;
use crate::hardware::si570::SI570;

/// The I2C bridge of a KCU1500 gateway: channel mux plus the Si570 reference oscillator.
pub struct Kcu1500I2c<B> {
    mux: I2cMux<B>,
    si570: SI570<B>,
}

impl Kcu1500I2c<PcieBus> {
    /// Opens the register space named in `config`.
    pub fn open(config: &BoardConfig) -> Result<Self> {
        config.si570.validate()?;
        let bus = PcieBus::open(&config.device_path)?;
        Self::new(bus, config)
    }
}

impl<B: Bus + Clone> Kcu1500I2c<B> {
    /// Fails with [`crate::Error::Argument`] when the programmer settings are invalid.
    pub fn new(bus: B, config: &BoardConfig) -> Result<Self> {
        log::debug!(
            "I2C mux @ {:#x}, Si570 @ {:#x}",
            config.mux_addr(),
            config.si570_base()
        );
        Ok(Self {
            mux: I2cMux::new(bus.clone(), config.mux_addr()),
            si570: SI570::new(bus, config.si570_base(), config.si570.clone())?,
        })
    }

    pub fn mux(&self) -> &I2cMux<B> {
        &self.mux
    }
}
