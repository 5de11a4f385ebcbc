use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use si570_globals::kcu1500::{
    KCU1500_DEVICE_PATH, KCU1500_I2C_BASE, KCU1500_I2C_MUX_OFFSET, KCU1500_SI570_FACTORY_MHZ,
    KCU1500_SI570_OFFSET,
};
use si570_globals::{SI570_OPERATION_TIMEOUT, SI570_RESET_POLL_INTERVAL, SI570_RESET_POLL_MAX};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings of one Si570 frequency programmer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgrammerConfig {
    /// Output frequency the part was factory programmed to, in MHz.
    pub factory_frequency_mhz: f64,
    pub reset_poll_interval_ms: u64,
    pub reset_poll_max: u32,
    /// Upper bound for a complete `set_frequency` call.
    pub operation_timeout_ms: u64,
}

impl Default for ProgrammerConfig {
    fn default() -> Self {
        Self {
            factory_frequency_mhz: KCU1500_SI570_FACTORY_MHZ,
            reset_poll_interval_ms: SI570_RESET_POLL_INTERVAL.as_millis() as u64,
            reset_poll_max: SI570_RESET_POLL_MAX,
            operation_timeout_ms: SI570_OPERATION_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ProgrammerConfig {
    pub fn reset_poll_interval(&self) -> Duration {
        Duration::from_millis(self.reset_poll_interval_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.factory_frequency_mhz.is_finite() || self.factory_frequency_mhz <= 0.0 {
            return Err(Error::Argument("factory frequency must be positive"));
        }
        if self.reset_poll_max == 0 {
            return Err(Error::Argument("reset_poll_max must be at least 1"));
        }
        Ok(())
    }
}

/// Location of the I2C bridge and the devices behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub device_path: PathBuf,
    pub i2c_base: u64,
    pub mux_offset: u64,
    pub si570_offset: u64,
    pub si570: ProgrammerConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(KCU1500_DEVICE_PATH),
            i2c_base: KCU1500_I2C_BASE,
            mux_offset: KCU1500_I2C_MUX_OFFSET,
            si570_offset: KCU1500_SI570_OFFSET,
            si570: ProgrammerConfig::default(),
        }
    }
}

impl BoardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.si570.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading board config from {}", path.display());
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn mux_addr(&self) -> u64 {
        self.i2c_base + self.mux_offset
    }

    pub fn si570_base(&self) -> u64 {
        self.i2c_base + self.si570_offset
    }
}
