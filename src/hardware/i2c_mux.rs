use crate::bus::Bus;
use crate::{Error, Result};
use si570_globals::kcu1500::{
    KCU1500_MUX_EEPROM, KCU1500_MUX_FAN, KCU1500_MUX_NONE, KCU1500_MUX_QSFP0, KCU1500_MUX_QSFP1,
    KCU1500_MUX_SI570,
};

/// Device connected to the shared I2C lines.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[repr(u8)]
pub enum I2cTarget {
    None = KCU1500_MUX_NONE,
    Qsfp1 = KCU1500_MUX_QSFP1,
    Si570 = KCU1500_MUX_SI570,
    Fan = KCU1500_MUX_FAN,
    Qsfp0 = KCU1500_MUX_QSFP0,
    Eeprom = KCU1500_MUX_EEPROM,
}

impl TryFrom<u8> for I2cTarget {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            KCU1500_MUX_NONE => Ok(I2cTarget::None),
            KCU1500_MUX_QSFP1 => Ok(I2cTarget::Qsfp1),
            KCU1500_MUX_SI570 => Ok(I2cTarget::Si570),
            KCU1500_MUX_FAN => Ok(I2cTarget::Fan),
            KCU1500_MUX_QSFP0 => Ok(I2cTarget::Qsfp0),
            KCU1500_MUX_EEPROM => Ok(I2cTarget::Eeprom),
            _ => {
                log::error!("unsupported I2C mux selection {value:#04x}");
                Err(Error::UnknownMuxSelection(value))
            }
        }
    }
}

/// Channel select register in front of the I2C bridge.
pub struct I2cMux<B> {
    bus: B,
    addr: u64,
}

impl<B: Bus> I2cMux<B> {
    pub fn new(bus: B, addr: u64) -> Self {
        Self { bus, addr }
    }

    pub fn select(&self, target: I2cTarget) -> Result<()> {
        log::debug!("Selecting I2C target {target:?}");
        self.bus.write_u32(self.addr, target as u32)
    }

    pub fn selected(&self) -> Result<I2cTarget> {
        let value = self.bus.read_u32(self.addr)?;
        I2cTarget::try_from((value & 0xff) as u8)
    }
}
