//! Register map and numeric limits of the Si570 programmable XO/VCXO as it is
//! exposed through the FPGA's I2C bridge.
//!
//! [Si570 Datasheet](https://www.skyworksinc.com/-/media/Skyworks/SL/documents/public/data-sheets/si570-71.pdf)

pub mod kcu1500;

use std::time::Duration;

/// Every 8 bit Si570 register occupies one 32 bit word on the AXI-Lite bus.
pub const SI570_ADDR_SIZE: u64 = 4;

/* Registers 7..=12 hold HS_DIV, N1 and RFREQ (startup frequency bank) */
pub const SI570_CONFIG_FIRST: u8 = 7;
pub const SI570_CONFIG_LAST: u8 = 12;
pub const SI570_CONFIG_LEN: usize = (SI570_CONFIG_LAST - SI570_CONFIG_FIRST + 1) as usize;

/* Register 135: reset/freeze/memory control
 *
 * RST_REG @ [7]    Reset of all internal logic, self clearing
 * NewFreq @ [6]    Alerts the DSPLL that a new frequency configuration was applied
 * Freeze M @ [5]   Prevents interim frequency changes when writing RFREQ
 * RECALL @ [0]     Write NVM bits into RAM, self clearing
 */
pub const SI570_REG_CONTROL: u8 = 135;
pub const SI570_CONTROL_RST_REG: u8 = 7;
pub const SI570_CONTROL_NEW_FREQ: u8 = 6;
pub const SI570_CONTROL_FREEZE_M: u8 = 5;
pub const SI570_CONTROL_RECALL: u8 = 0;

/* Register 137: Freeze DCO @ [4] */
pub const SI570_REG_FREEZE_DCO: u8 = 137;
pub const SI570_FREEZE_DCO_BIT: u8 = 4;

/// Lower bound of the DCO range in MHz, exclusive.
pub const SI570_FDCO_MIN_MHZ: f64 = 4850.0;
/// Upper bound of the DCO range in MHz, exclusive.
pub const SI570_FDCO_MAX_MHZ: f64 = 5670.0;

/// RFREQ is a fixed point number with 28 fractional bits.
pub const SI570_RFREQ_FRAC_BITS: u32 = 28;
pub const SI570_RFREQ_SCALE: f64 = (1u64 << SI570_RFREQ_FRAC_BITS) as f64;

/// HS_DIV values in the order the parameter search tries them.
/// Higher dividers come first to keep N1 low.
pub const SI570_HS_DIV_SEARCH: [u8; 6] = [11, 9, 7, 6, 5, 4];

/// Largest N1 the parameter search considers.
pub const SI570_N1_SEARCH_MAX: u8 = 126;
/// Largest N1 the 7 bit field can encode.
pub const SI570_N1_MAX: u8 = 128;

/// Delay between two polls of RST_REG after a RECALL.
pub const SI570_RESET_POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Number of RST_REG polls before giving up on a RECALL.
pub const SI570_RESET_POLL_MAX: u32 = 100;
/// Upper bound for one complete frequency update.
pub const SI570_OPERATION_TIMEOUT: Duration = Duration::from_secs(1);

/// N1 candidates in search order: 1 followed by every even divider up to 126.
pub fn n1_search_order() -> impl Iterator<Item = u8> {
    std::iter::once(1).chain((2..=SI570_N1_SEARCH_MAX).step_by(2))
}

/// Byte offset of an Si570 register relative to the device window.
pub const fn si570_register_offset(register: u8) -> u64 {
    register as u64 * SI570_ADDR_SIZE
}
