//! Software model of an Si570 behind the I2C bridge.
//!
//! Implements [`Bus`] so the driver can run without hardware. Registers outside the Si570
//! window behave as plain memory, which covers the I2C mux select register.
//!
//! Modelled behaviour:
//! - RECALL and RST_REG copy the NVM image into registers 7 to 12 and keep RST_REG set
//!   for a configurable number of polls
//! - NewFreq adopts the current configuration unless the DCO is frozen
//! - the adopted output frequency is `fxtal * RFREQ / (HS_DIV * N1)`
//! - faults can be injected per address to fail or corrupt accesses

use crate::bus::Bus;
use crate::hardware::si570::find_params;
use crate::{Error, Result};
use si570_globals::{
    SI570_ADDR_SIZE, SI570_CONFIG_FIRST, SI570_CONFIG_LAST, SI570_CONTROL_FREEZE_M,
    SI570_CONTROL_NEW_FREQ, SI570_CONTROL_RECALL, SI570_CONTROL_RST_REG, SI570_FREEZE_DCO_BIT,
    SI570_REG_CONTROL, SI570_REG_FREEZE_DCO, si570_register_offset,
};
use si570_regs::{ConfigImage, HsDiv};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of RST_REG polls that read busy after a RECALL, unless configured otherwise.
const RESET_BUSY_POLLS: u32 = 2;
/// Si570 registers span 0..=255, one word each.
const WINDOW_LEN: u64 = 256 * SI570_ADDR_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// The read returns [`Error::DeviceIo`].
    FailRead,
    /// The write returns [`Error::DeviceIo`] and is not performed.
    FailWrite,
    /// The write succeeds but stores the inverted value.
    CorruptWrite,
}

/// One-shot fault on an absolute bus address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub addr: u64,
    /// Number of matching accesses to let through before the fault fires.
    pub skip: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read { addr: u64, value: u32 },
    Write { addr: u64, value: u32 },
}

struct SimState {
    window: u64,
    fxtal_mhz: f64,
    nvm: ConfigImage,
    regs: [u8; 256],
    memory: HashMap<u64, u32>,
    reset_busy_polls: Option<u32>,
    busy_remaining: Option<u32>,
    faults: Vec<Fault>,
    accesses: Vec<Access>,
    output_mhz: Option<f64>,
    recalls: u32,
}

impl SimState {
    fn take_fault(&mut self, addr: u64, write: bool) -> Option<FaultKind> {
        let position = self.faults.iter().position(|fault| {
            fault.addr == addr
                && match fault.kind {
                    FaultKind::FailRead => !write,
                    FaultKind::FailWrite | FaultKind::CorruptWrite => write,
                }
        })?;
        let fault = &mut self.faults[position];
        if fault.skip > 0 {
            fault.skip -= 1;
            return None;
        }
        Some(self.faults.remove(position).kind)
    }

    fn register(&self, addr: u64) -> Option<u8> {
        if addr < self.window || addr >= self.window + WINDOW_LEN {
            return None;
        }
        let offset = addr - self.window;
        if offset % SI570_ADDR_SIZE != 0 {
            return None;
        }
        Some((offset / SI570_ADDR_SIZE) as u8)
    }

    fn load_nvm(&mut self) {
        let first = SI570_CONFIG_FIRST as usize;
        let last = SI570_CONFIG_LAST as usize;
        self.regs[first..=last].copy_from_slice(self.nvm.as_bytes());
        self.busy_remaining = self.reset_busy_polls;
        self.recalls += 1;
    }

    fn frozen(&self) -> bool {
        self.regs[SI570_REG_FREEZE_DCO as usize] & (1 << SI570_FREEZE_DCO_BIT) != 0
    }

    fn current_image(&self) -> ConfigImage {
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&self.regs[SI570_CONFIG_FIRST as usize..=SI570_CONFIG_LAST as usize]);
        ConfigImage::from_bytes(bytes)
    }

    fn adopt(&mut self) {
        if self.frozen() {
            log::warn!("NewFreq while DCO frozen, ignored");
            return;
        }
        let image = self.current_image();
        let fxtal = self.fxtal_mhz;
        self.output_mhz = image
            .hs_div()
            .ok()
            .map(|hs_div| fxtal * image.rfreq() / (hs_div.divider() as f64 * image.n1() as f64));
        log::debug!("Simulated output now {:?} MHz", self.output_mhz);
    }

    fn read_register(&mut self, register: u8) -> u8 {
        let value = self.regs[register as usize];
        if register != SI570_REG_CONTROL {
            return value;
        }
        match self.busy_remaining {
            Some(0) => value,
            Some(remaining) => {
                self.busy_remaining = Some(remaining - 1);
                value | (1 << SI570_CONTROL_RST_REG)
            }
            None => value | (1 << SI570_CONTROL_RST_REG),
        }
    }

    fn write_register(&mut self, register: u8, value: u8) {
        if register != SI570_REG_CONTROL {
            self.regs[register as usize] = value;
            return;
        }
        if value & (1 << SI570_CONTROL_RST_REG) != 0 {
            self.regs[SI570_REG_FREEZE_DCO as usize] = 0;
            self.load_nvm();
        }
        if value & (1 << SI570_CONTROL_RECALL) != 0 {
            self.load_nvm();
        }
        // Strobes clear themselves, only Freeze M is kept
        self.regs[SI570_REG_CONTROL as usize] = value & (1 << SI570_CONTROL_FREEZE_M);
        if value & (1 << SI570_CONTROL_NEW_FREQ) != 0 {
            self.adopt();
        }
    }
}

/// Cloneable handle to one simulated device.
#[derive(Clone)]
pub struct SimulatedSi570 {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedSi570 {
    /// A device at `window` whose NVM holds `nvm` and whose crystal runs at `fxtal_mhz`.
    pub fn new(window: u64, fxtal_mhz: f64, nvm: ConfigImage) -> Self {
        let mut state = SimState {
            window,
            fxtal_mhz,
            nvm,
            regs: [0u8; 256],
            memory: HashMap::new(),
            reset_busy_polls: Some(RESET_BUSY_POLLS),
            busy_remaining: Some(0),
            faults: Vec::new(),
            accesses: Vec::new(),
            output_mhz: None,
            recalls: 0,
        };
        state.load_nvm();
        state.recalls = 0;
        state.busy_remaining = Some(0);
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// A device factory programmed to `factory_mhz`, with NVM contents computed the same
    /// way the driver computes them.
    pub fn factory(window: u64, fxtal_mhz: f64, factory_mhz: f64) -> Result<Self> {
        let params = find_params(factory_mhz)?;
        let mut nvm = ConfigImage::new();
        nvm.set_n1(params.n1)?;
        nvm.set_hs_div(params.hs_div);
        nvm.set_rfreq(params.fdco(factory_mhz) / fxtal_mhz)?;
        let sim = Self::new(window, fxtal_mhz, nvm);
        sim.state().output_mhz = Some(factory_mhz);
        Ok(sim)
    }

    /// A device whose NVM RFREQ was never programmed.
    pub fn uncalibrated(window: u64, fxtal_mhz: f64) -> Self {
        let mut nvm = ConfigImage::new();
        nvm.set_hs_div(HsDiv::Div4);
        Self::new(window, fxtal_mhz, nvm)
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of RST_REG polls reading busy after each RECALL. `None` never clears.
    pub fn set_reset_busy_polls(&self, polls: Option<u32>) {
        self.state().reset_busy_polls = polls;
    }

    pub fn inject(&self, fault: Fault) {
        log::debug!("Injecting {fault:?}");
        self.state().faults.push(fault);
    }

    pub fn pending_faults(&self) -> usize {
        self.state().faults.len()
    }

    pub fn window(&self) -> u64 {
        self.state().window
    }

    /// Absolute bus address of Si570 register `register`.
    pub fn register_addr(&self, register: u8) -> u64 {
        self.window() + si570_register_offset(register)
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state().regs[register as usize]
    }

    /// Overwrites a register without going through the bus.
    pub fn poke(&self, register: u8, value: u8) {
        self.state().regs[register as usize] = value;
    }

    pub fn config_image(&self) -> ConfigImage {
        self.state().current_image()
    }

    pub fn nvm(&self) -> ConfigImage {
        self.state().nvm
    }

    pub fn freeze_dco(&self) -> bool {
        self.state().frozen()
    }

    pub fn output_frequency(&self) -> Option<f64> {
        self.state().output_mhz
    }

    pub fn recalls(&self) -> u32 {
        self.state().recalls
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.state().accesses.clone()
    }

    pub fn clear_accesses(&self) {
        self.state().accesses.clear();
    }

    /// Word stored at an address outside the Si570 window.
    pub fn memory(&self, addr: u64) -> u32 {
        self.state().memory.get(&addr).copied().unwrap_or(0)
    }

    pub fn write_memory(&self, addr: u64, value: u32) {
        self.state().memory.insert(addr, value);
    }
}

fn injected(addr: u64) -> Error {
    Error::DeviceIo {
        addr,
        source: std::io::Error::other("injected bus fault"),
    }
}

impl Bus for SimulatedSi570 {
    fn read_u32(&self, addr: u64) -> Result<u32> {
        let mut state = self.state();
        if let Some(FaultKind::FailRead) = state.take_fault(addr, false) {
            log::trace!("Injected read fault at {addr:#x}");
            return Err(injected(addr));
        }
        let value = match state.register(addr) {
            Some(register) => state.read_register(register) as u32,
            None => state.memory.get(&addr).copied().unwrap_or(0),
        };
        state.accesses.push(Access::Read { addr, value });
        Ok(value)
    }

    fn write_u32(&self, addr: u64, value: u32) -> Result<()> {
        let mut state = self.state();
        let value = match state.take_fault(addr, true) {
            Some(FaultKind::FailWrite) => {
                log::trace!("Injected write fault at {addr:#x}");
                return Err(injected(addr));
            }
            Some(FaultKind::CorruptWrite) => !value & 0xff,
            _ => value,
        };
        state.accesses.push(Access::Write { addr, value });
        match state.register(addr) {
            Some(register) => state.write_register(register, (value & 0xff) as u8),
            None => {
                state.memory.insert(addr, value);
            }
        }
        Ok(())
    }
}
