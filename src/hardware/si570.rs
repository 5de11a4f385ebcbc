use crate::bus::Bus;
use crate::config::ProgrammerConfig;
use crate::register::RegisterBlock;
use crate::{Error, Result};
use si570_globals::{
    SI570_CONFIG_FIRST, SI570_CONFIG_LAST, SI570_CONTROL_FREEZE_M, SI570_CONTROL_NEW_FREQ,
    SI570_CONTROL_RECALL, SI570_CONTROL_RST_REG, SI570_FDCO_MAX_MHZ, SI570_FDCO_MIN_MHZ,
    SI570_FREEZE_DCO_BIT, SI570_HS_DIV_SEARCH, SI570_REG_CONTROL, SI570_REG_FREEZE_DCO,
    n1_search_order,
};
use si570_regs::{ConfigImage, HsDiv};
use std::ops::RangeInclusive;
use std::thread;
use std::time::Instant;

const REGS_HS_DIV: RangeInclusive<u8> = SI570_CONFIG_FIRST..=SI570_CONFIG_FIRST;
const REGS_N1: RangeInclusive<u8> = SI570_CONFIG_FIRST..=SI570_CONFIG_FIRST + 1;
const REGS_RFREQ: RangeInclusive<u8> = SI570_CONFIG_FIRST + 1..=SI570_CONFIG_LAST;
const REGS_ALL: RangeInclusive<u8> = SI570_CONFIG_FIRST..=SI570_CONFIG_LAST;

/// Whether a getter uses the shadow registers or reads the device first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    Cached,
    Fresh,
}

/// Whether a setter only updates the shadow registers or also writes the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Deferred,
    Immediate,
}

/// Progress of [`SI570::set_frequency`].
///
/// After a failure the programmer stays in the state whose action failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramState {
    Idle,
    Recalling,
    WaitReset,
    Frozen,
    Committing,
    Unfrozen,
    Done,
}

/// Output divider pair selected for a target frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Si570Params {
    pub n1: u8,
    pub hs_div: HsDiv,
}

impl Si570Params {
    /// DCO frequency needed to produce `frequency_mhz` with these dividers.
    pub fn fdco(&self, frequency_mhz: f64) -> f64 {
        frequency_mhz * self.hs_div.divider() as f64 * self.n1 as f64
    }
}

/// Finds the first divider pair placing the DCO inside its range.
///
/// N1 is walked upwards and HS_DIV downwards, so the lowest N1 wins and the highest
/// HS_DIV wins among equal N1.
pub fn find_params(frequency_mhz: f64) -> Result<Si570Params> {
    for n1 in n1_search_order() {
        for divider in SI570_HS_DIV_SEARCH {
            let fdco = frequency_mhz * divider as f64 * n1 as f64;
            if SI570_FDCO_MIN_MHZ < fdco && fdco < SI570_FDCO_MAX_MHZ {
                let hs_div = HsDiv::from_divider(divider)?;
                log::trace!("{frequency_mhz} MHz: N1={n1} HS_DIV={hs_div} FDCO={fdco}");
                return Ok(Si570Params { n1, hs_div });
            }
        }
    }
    Err(Error::NoFeasibleParameters { frequency_mhz })
}

pub struct SI570<B> {
    regs: RegisterBlock<B>,
    image: ConfigImage,
    config: ProgrammerConfig,
    state: ProgramState,
    /// FreezeM as last written, carried along with every strobe of register 135.
    freeze_m: bool,
}

impl<B: Bus> SI570<B> {
    pub fn new(bus: B, base: u64, config: ProgrammerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            regs: RegisterBlock::new(bus, base),
            image: ConfigImage::new(),
            config,
            state: ProgramState::Idle,
            freeze_m: false,
        })
    }

    pub fn config(&self) -> &ProgrammerConfig {
        &self.config
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    /// Shadow of registers 7 to 12 as of the last read or setter call.
    pub fn image(&self) -> &ConfigImage {
        &self.image
    }

    pub fn registers(&self) -> &RegisterBlock<B> {
        &self.regs
    }

    fn load(&mut self, registers: RangeInclusive<u8>) -> Result<()> {
        for register in registers {
            let value = self.regs.read(register)?;
            self.image.set_register(register, value)?;
        }
        Ok(())
    }

    fn store(&mut self, registers: RangeInclusive<u8>) -> Result<()> {
        let first = *registers.start();
        let data = registers
            .map(|register| self.image.register(register))
            .collect::<std::result::Result<Vec<u8>, _>>()?;
        self.regs.write_range(first, &data, true)
    }

    fn fetch(&mut self, mode: ReadMode, registers: RangeInclusive<u8>) -> Result<()> {
        match mode {
            ReadMode::Cached => Ok(()),
            ReadMode::Fresh => self.load(registers),
        }
    }

    fn flush(&mut self, mode: WriteMode, registers: RangeInclusive<u8>) -> Result<()> {
        match mode {
            WriteMode::Deferred => Ok(()),
            WriteMode::Immediate => self.store(registers),
        }
    }

    /// Reloads the whole shadow from the device.
    pub fn refresh(&mut self) -> Result<()> {
        self.load(REGS_ALL)
    }

    /// Writes the whole shadow to the device and verifies it.
    pub fn commit(&mut self) -> Result<()> {
        self.store(REGS_ALL)
    }

    pub fn n1_raw(&mut self, mode: ReadMode) -> Result<u8> {
        self.fetch(mode, REGS_N1)?;
        Ok(self.image.n1_raw())
    }

    pub fn set_n1_raw(&mut self, value: u8, mode: WriteMode) -> Result<()> {
        self.image.set_n1_raw(value)?;
        self.flush(mode, REGS_N1)
    }

    /// CLKOUT output divider, 1 or an even number up to 128.
    pub fn n1(&mut self, mode: ReadMode) -> Result<u8> {
        self.fetch(mode, REGS_N1)?;
        Ok(self.image.n1())
    }

    pub fn set_n1(&mut self, n1: u8, mode: WriteMode) -> Result<()> {
        self.image.set_n1(n1)?;
        self.flush(mode, REGS_N1)
    }

    pub fn hs_div(&mut self, mode: ReadMode) -> Result<HsDiv> {
        self.fetch(mode, REGS_HS_DIV)?;
        Ok(self.image.hs_div()?)
    }

    pub fn set_hs_div(&mut self, hs_div: HsDiv, mode: WriteMode) -> Result<()> {
        self.image.set_hs_div(hs_div);
        self.flush(mode, REGS_HS_DIV)
    }

    pub fn hs_div_int(&mut self, mode: ReadMode) -> Result<u8> {
        Ok(self.hs_div(mode)?.divider())
    }

    pub fn set_hs_div_int(&mut self, divider: u8, mode: WriteMode) -> Result<()> {
        self.set_hs_div(HsDiv::from_divider(divider)?, mode)
    }

    pub fn rfreq_raw(&mut self, mode: ReadMode) -> Result<u64> {
        self.fetch(mode, REGS_RFREQ)?;
        Ok(self.image.rfreq_raw())
    }

    pub fn set_rfreq_raw(&mut self, value: u64, mode: WriteMode) -> Result<()> {
        self.image.set_rfreq_raw(value)?;
        self.flush(mode, REGS_RFREQ)
    }

    /// Frequency control input of the DCO.
    pub fn rfreq(&mut self, mode: ReadMode) -> Result<f64> {
        self.fetch(mode, REGS_RFREQ)?;
        Ok(self.image.rfreq())
    }

    pub fn set_rfreq(&mut self, value: f64, mode: WriteMode) -> Result<()> {
        self.image.set_rfreq(value)?;
        self.flush(mode, REGS_RFREQ)
    }

    /// Crystal frequency in MHz backed out from the current configuration.
    ///
    /// Only meaningful right after a RECALL, while the registers still hold the factory
    /// configuration. Returns 0 when RFREQ is zero.
    pub fn fxtal(&mut self, mode: ReadMode) -> Result<f64> {
        self.fetch(mode, REGS_ALL)?;
        let rfreq = self.image.rfreq();
        if rfreq == 0.0 {
            return Ok(0.0);
        }
        let hs_div = self.image.hs_div_int()? as f64;
        let n1 = self.image.n1() as f64;
        Ok(self.config.factory_frequency_mhz * hs_div * n1 / rfreq)
    }

    fn control_hold(&self) -> u8 {
        if self.freeze_m {
            1 << SI570_CONTROL_FREEZE_M
        } else {
            0
        }
    }

    /// Writes the NVM bits into RAM. Resets the part without interrupting I2C.
    pub fn recall(&self) -> Result<()> {
        self.regs
            .issue_command(SI570_REG_CONTROL, SI570_CONTROL_RECALL, self.control_hold())
    }

    /// Resets all internal logic and tristates the output during reset.
    /// Interrupts the I2C state machine, prefer [`SI570::recall`]. Clears FreezeM.
    pub fn reset(&mut self) -> Result<()> {
        self.freeze_m = false;
        self.regs.issue_command(SI570_REG_CONTROL, SI570_CONTROL_RST_REG, 0)
    }

    /// Alerts the DSPLL that a new frequency configuration has been applied.
    pub fn new_freq(&self) -> Result<()> {
        self.regs
            .issue_command(SI570_REG_CONTROL, SI570_CONTROL_NEW_FREQ, self.control_hold())
    }

    pub fn reset_in_progress(&self) -> Result<bool> {
        self.regs.read_bit(SI570_REG_CONTROL, SI570_CONTROL_RST_REG)
    }

    pub fn freeze_m(&self) -> Result<bool> {
        self.regs.read_bit(SI570_REG_CONTROL, SI570_CONTROL_FREEZE_M)
    }

    /// Prevents interim frequency changes while writing RFREQ.
    ///
    /// The setting is kept across [`SI570::recall`] and [`SI570::new_freq`] strobes.
    pub fn set_freeze_m(&mut self, freeze: bool) -> Result<()> {
        self.regs.write_bit(SI570_REG_CONTROL, SI570_CONTROL_FREEZE_M, freeze)?;
        self.freeze_m = freeze;
        Ok(())
    }

    pub fn freeze_dco(&self) -> Result<bool> {
        self.regs.read_bit(SI570_REG_FREEZE_DCO, SI570_FREEZE_DCO_BIT)
    }

    /// Freezes the DSPLL so the frequency configuration can be modified.
    pub fn set_freeze_dco(&self, freeze: bool) -> Result<()> {
        self.regs.write_bit(SI570_REG_FREEZE_DCO, SI570_FREEZE_DCO_BIT, freeze)
    }

    fn enter(&mut self, next: ProgramState, started: Instant) -> Result<()> {
        self.check_deadline(started)?;
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn check_deadline(&self, started: Instant) -> Result<()> {
        let elapsed = started.elapsed();
        if elapsed >= self.config.operation_timeout() {
            log::warn!("Frequency update timed out in {:?}", self.state);
            return Err(Error::Timeout {
                state: self.state,
                elapsed,
            });
        }
        Ok(())
    }

    fn wait_reset(&self, started: Instant) -> Result<()> {
        for poll in 1..=self.config.reset_poll_max {
            thread::sleep(self.config.reset_poll_interval());
            if !self.reset_in_progress()? {
                log::debug!("Reset done after {poll} polls");
                return Ok(());
            }
            self.check_deadline(started)?;
        }
        log::warn!("RST_REG still set after {} polls", self.config.reset_poll_max);
        Err(Error::ResetTimeout {
            polls: self.config.reset_poll_max,
        })
    }

    /// Programs the output to `frequency_mhz`.
    ///
    /// Runs RECALL, derives the crystal frequency from the factory configuration, freezes
    /// the DCO, writes N1, HS_DIV and RFREQ in one verified block, unfreezes and strobes
    /// NewFreq. A failure leaves the device as the failed step left it; calling again
    /// starts over from the RECALL.
    pub fn set_frequency(&mut self, frequency_mhz: f64) -> Result<()> {
        log::trace!("Setting Si570 frequency to {frequency_mhz} MHz");
        self.state = ProgramState::Idle;
        let params = find_params(frequency_mhz)?;
        let fdco = params.fdco(frequency_mhz);

        let started = Instant::now();

        self.enter(ProgramState::Recalling, started)?;
        self.recall()?;

        self.enter(ProgramState::WaitReset, started)?;
        self.wait_reset(started)?;

        self.enter(ProgramState::Frozen, started)?;
        let fxtal = self.fxtal(ReadMode::Fresh)?;
        if fxtal == 0.0 {
            log::error!("RFREQ is zero, can not derive fxtal");
            return Err(Error::UncalibratedDevice);
        }
        log::debug!("fxtal: {fxtal} MHz");
        self.set_freeze_dco(true)?;

        self.enter(ProgramState::Committing, started)?;
        let rfreq = fdco / fxtal;
        log::debug!(
            "N1={} HS_DIV={} FDCO={fdco} MHz RFREQ={rfreq}",
            params.n1,
            params.hs_div
        );
        self.set_n1(params.n1, WriteMode::Deferred)?;
        self.set_hs_div(params.hs_div, WriteMode::Deferred)?;
        self.set_rfreq(rfreq, WriteMode::Deferred)?;
        self.commit()?;

        self.enter(ProgramState::Unfrozen, started)?;
        self.set_freeze_dco(false)?;

        self.enter(ProgramState::Done, started)?;
        self.new_freq()
    }
}
