use crate::bus::Bus;
use crate::{Error, Result};
use si570_globals::SI570_ADDR_SIZE;
use std::ops::RangeInclusive;

const REGISTER_COUNT: usize = 256;

/// Window of 8 bit device registers on a [`Bus`], one register per 32 bit word.
#[derive(Clone, Debug)]
pub struct RegisterBlock<B> {
    bus: B,
    base: u64,
}

impl<B: Bus> RegisterBlock<B> {
    pub fn new(bus: B, base: u64) -> Self {
        Self { bus, base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn addr(&self, register: u8) -> u64 {
        self.base + register as u64 * SI570_ADDR_SIZE
    }

    pub fn read(&self, register: u8) -> Result<u8> {
        let value = (self.bus.read_u32(self.addr(register))? & 0xff) as u8;
        log::trace!("R{register} -> {value:#04x}");
        Ok(value)
    }

    pub fn write(&self, register: u8, value: u8) -> Result<()> {
        log::trace!("R{register} <- {value:#04x}");
        self.bus.write_u32(self.addr(register), value as u32)
    }

    /// Read-modify-write of the bits selected by `mask`.
    pub fn modify(&self, register: u8, mask: u8, value: u8) -> Result<()> {
        let data = self.read(register)?;
        self.write(register, (data & !mask) | (value & mask))
    }

    pub fn read_bit(&self, register: u8, bit: u8) -> Result<bool> {
        Ok(self.read(register)? & (1 << bit) != 0)
    }

    pub fn write_bit(&self, register: u8, bit: u8, set: bool) -> Result<()> {
        self.modify(register, 1 << bit, if set { 1 << bit } else { 0 })
    }

    pub fn read_range(&self, registers: RangeInclusive<u8>) -> Result<Vec<u8>> {
        registers.map(|register| self.read(register)).collect()
    }

    /// Writes `data` to consecutive registers starting at `first`.
    ///
    /// With `verify` every register is read back once the whole block was written and the
    /// first difference is reported as [`Error::VerifyMismatch`].
    pub fn write_range(&self, first: u8, data: &[u8], verify: bool) -> Result<()> {
        if first as usize + data.len() > REGISTER_COUNT {
            return Err(Error::Argument("register range past register 255"));
        }
        for (i, value) in data.iter().enumerate() {
            self.write(first + i as u8, *value)?;
        }
        if !verify {
            return Ok(());
        }
        for (i, written) in data.iter().enumerate() {
            let register = first + i as u8;
            let read = self.read(register)?;
            if read != *written {
                log::warn!("R{register} verify failed: wrote {written:#04x}, read {read:#04x}");
                return Err(Error::VerifyMismatch {
                    register,
                    written: *written,
                    read,
                });
            }
        }
        Ok(())
    }

    /// Write-one strobe. The device clears the bit on its own, bits in `hold` are written
    /// as set alongside it.
    pub fn issue_command(&self, register: u8, bit: u8, hold: u8) -> Result<()> {
        log::trace!("R{register} strobe bit {bit}");
        self.write(register, hold | (1 << bit))
    }
}
