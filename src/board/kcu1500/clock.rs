use crate::Result;
use crate::board::kcu1500::Kcu1500I2c;
use crate::bus::Bus;
use crate::hardware::i2c_mux::I2cTarget;
use crate::hardware::si570::SI570;

impl<B: Bus + Clone> Kcu1500I2c<B> {
    /// Direct access to the oscillator. The mux has to point at it already, see
    /// [`Kcu1500I2c::select_si570`].
    pub fn si570(&mut self) -> &mut SI570<B> {
        &mut self.si570
    }

    pub fn select_si570(&self) -> Result<()> {
        self.mux.select(I2cTarget::Si570)
    }

    /// Routes the I2C bus to the Si570 and programs its output to `frequency_mhz`.
    pub fn program_si570(&mut self, frequency_mhz: f64) -> Result<()> {
        log::trace!("Programming Si570 to {frequency_mhz} MHz");
        self.select_si570()?;
        self.si570.set_frequency(frequency_mhz)
    }
}
