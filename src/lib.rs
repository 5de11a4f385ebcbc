//! Host side driver for the Si570 programmable oscillator found behind the I2C bridge of
//! PCIe attached KCU1500 gateway firmware.
//!
//! The Si570 is reached through memory mapped AXI-Lite registers: every 8 bit device
//! register occupies one 32 bit word of the bridge window. This crate keeps a shadow
//! copy of the frequency configuration registers, exposes the packed N1, HS_DIV and RFREQ
//! fields and implements the frequency update procedure described in the datasheet.
//!
//! ## Usage overview
//!
//! Open the board with [`Kcu1500I2c::open`] using a [`BoardConfig`], then call
//! [`Kcu1500I2c::program_si570`] with the desired output frequency in MHz. The I2C mux is
//! switched to the oscillator and the full recall/freeze/commit/unfreeze sequence is run.
//!
//! For lower level access an [`SI570`] can be built on top of any [`Bus`]. The
//! [`sim::SimulatedSi570`] bus models the device and is what the tests and the
//! `program --simulate` demo run against:
//!
//! ```bash
//! cargo run --package program -- --simulate --frequency 100
//! ```
//!
//! ## Frequency update procedure
//!
//! 1. RECALL the NVM defaults and wait for RST_REG to clear
//! 2. Back out the crystal frequency from the factory RFREQ, HS_DIV and N1
//! 3. Freeze the DCO
//! 4. Write N1, HS_DIV and RFREQ in one verified block write
//! 5. Unfreeze the DCO and strobe NewFreq
//!
//! One [`SI570`] instance must own the device for the whole sequence. All mutating
//! operations take `&mut self`.
//!
//! ### Si570
//! [Si570 Datasheet](https://www.skyworksinc.com/-/media/Skyworks/SL/documents/public/data-sheets/si570-71.pdf)

pub mod board;
pub mod bus;
pub mod config;
pub mod hardware;
pub mod register;
pub mod sim;

pub use board::kcu1500::Kcu1500I2c;
pub use bus::{Bus, PcieBus};
pub use config::{BoardConfig, ProgrammerConfig};
pub use hardware::i2c_mux::{I2cMux, I2cTarget};
pub use hardware::si570::{ProgramState, ReadMode, SI570, Si570Params, WriteMode, find_params};

pub use si570_globals::*;
pub use si570_regs::{ConfigImage, FieldError, HsDiv};

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Register read or write failed on the bus.
    #[error("device io at {addr:#x}")]
    DeviceIo {
        /// Absolute bus address of the failed access.
        addr: u64,
        #[source]
        source: std::io::Error,
    },
    /// A written register did not read back with the written value.
    #[error("verify mismatch on register {register}: wrote {written:#04x}, read {read:#04x}")]
    VerifyMismatch { register: u8, written: u8, read: u8 },
    /// RST_REG never cleared after a RECALL.
    #[error("reset still in progress after {polls} polls")]
    ResetTimeout { polls: u32 },
    /// No N1/HS_DIV combination places the DCO inside its range.
    #[error("no N1/HS_DIV pair reaches {frequency_mhz} MHz")]
    NoFeasibleParameters { frequency_mhz: f64 },
    /// RFREQ reads as zero so the crystal frequency can not be derived.
    ///
    /// The device has to be calibrated out of band before it can be tuned.
    #[error("RFREQ is zero, device is not calibrated")]
    UncalibratedDevice,
    #[error("{0}")]
    Field(#[from] FieldError),
    /// The frequency update took longer than the configured operation timeout.
    #[error("timeout in state {state:?} after {elapsed:?}")]
    Timeout {
        state: ProgramState,
        elapsed: Duration,
    },
    #[error("unknown I2C mux selection {0:#04x}")]
    UnknownMuxSelection(u8),
    /// Invalid argument provided
    #[error("{0}")]
    Argument(&'static str),
    #[error("config")]
    Config(#[from] serde_json::Error),
    /// I/O error occurred.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Result type for operations that may return an `Error`.
pub type Result<T> = std::result::Result<T, Error>;
