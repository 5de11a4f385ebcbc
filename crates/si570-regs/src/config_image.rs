/* Shadow of the Si570 startup frequency configuration, registers 7 to 12.
 *
 * +================+=======================================================+
 * |    Register    |  Bits                                                 |
 * +================+=======================================================+
 * |        7       | [7:5] HS_DIV code       [4:0] N1_RAW[6:2]             |
 * +----------------+-------------------------------------------------------+
 * |        8       | [7:6] N1_RAW[1:0]  [5] reserved  [4:0] RFREQ[36:32]   |
 * +----------------+-------------------------------------------------------+
 * |        9       | RFREQ[31:24]                                          |
 * +----------------+-------------------------------------------------------+
 * |       10       | RFREQ[23:16]                                          |
 * +----------------+-------------------------------------------------------+
 * |       11       | RFREQ[15:8]                                           |
 * +----------------+-------------------------------------------------------+
 * |       12       | RFREQ[7:0]                                            |
 * +----------------+-------------------------------------------------------+
 *
 * N1 = N1_RAW + 1, legal values are 1 and even numbers up to 128.
 * RFREQ is fixed point with 28 fractional bits.
 *
 * Setters only touch the bits of their own field. Bit 5 of register 8 is
 * never written by any field.
 */
use crate::{FieldError, HsDiv};
use si570_globals::{
    SI570_CONFIG_FIRST, SI570_CONFIG_LAST, SI570_CONFIG_LEN, SI570_N1_MAX, SI570_RFREQ_SCALE,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigImage {
    buf: [u8; SI570_CONFIG_LEN],
}

impl ConfigImage {
    const IDX_HS_N1: usize = 0;
    const IDX_N1_RFREQ: usize = 1;
    const IDX_RFREQ_LSB: usize = SI570_CONFIG_LEN - 1;

    const HS_DIV_SHIFT: u8 = 5;
    const HS_DIV_MASK: u8 = 0xe0;
    const N1_HIGH_MASK: u8 = 0x1f;
    const N1_LOW_MASK: u8 = 0xc0;
    const RFREQ_HIGH_MASK: u8 = 0x1f;

    pub const N1_RAW_MAX: u8 = 0x7f;
    pub const RFREQ_BITS: u32 = 37;
    pub const RFREQ_RAW_MAX: u64 = (1 << Self::RFREQ_BITS) - 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: [u8; SI570_CONFIG_LEN]) -> Self {
        Self { buf: bytes }
    }

    pub fn as_bytes(&self) -> &[u8; SI570_CONFIG_LEN] {
        &self.buf
    }

    fn index(register: u8) -> Result<usize, FieldError> {
        if (SI570_CONFIG_FIRST..=SI570_CONFIG_LAST).contains(&register) {
            Ok((register - SI570_CONFIG_FIRST) as usize)
        } else {
            Err(FieldError::NotInImage(register))
        }
    }

    pub fn register(&self, register: u8) -> Result<u8, FieldError> {
        Ok(self.buf[Self::index(register)?])
    }

    pub fn set_register(&mut self, register: u8, value: u8) -> Result<&mut Self, FieldError> {
        self.buf[Self::index(register)?] = value;
        Ok(self)
    }

    pub fn n1_raw(&self) -> u8 {
        let high = self.buf[Self::IDX_HS_N1];
        let low = self.buf[Self::IDX_N1_RFREQ];
        ((high & Self::N1_HIGH_MASK) << 2) | ((low & Self::N1_LOW_MASK) >> 6)
    }

    pub fn set_n1_raw(&mut self, value: u8) -> Result<&mut Self, FieldError> {
        if value > Self::N1_RAW_MAX {
            return Err(FieldError::OutOfRange {
                field: "N1_RAW",
                value: value as u64,
            });
        }
        let high = &mut self.buf[Self::IDX_HS_N1];
        *high = (*high & !Self::N1_HIGH_MASK) | ((value & 0x7c) >> 2);

        let low = &mut self.buf[Self::IDX_N1_RFREQ];
        *low = (*low & !Self::N1_LOW_MASK) | ((value & 0x03) << 6);
        Ok(self)
    }

    pub fn n1(&self) -> u8 {
        self.n1_raw() + 1
    }

    pub fn set_n1(&mut self, n1: u8) -> Result<&mut Self, FieldError> {
        if n1 == 0 || n1 > SI570_N1_MAX || (n1 != 1 && n1 % 2 != 0) {
            return Err(FieldError::OutOfRange {
                field: "N1",
                value: n1 as u64,
            });
        }
        self.set_n1_raw(n1 - 1)
    }

    pub fn hs_div(&self) -> Result<HsDiv, FieldError> {
        HsDiv::try_from((self.buf[Self::IDX_HS_N1] & Self::HS_DIV_MASK) >> Self::HS_DIV_SHIFT)
    }

    pub fn set_hs_div(&mut self, hs_div: HsDiv) -> &mut Self {
        let reg = &mut self.buf[Self::IDX_HS_N1];
        *reg = (*reg & !Self::HS_DIV_MASK) | (hs_div.code() << Self::HS_DIV_SHIFT);
        self
    }

    pub fn hs_div_int(&self) -> Result<u8, FieldError> {
        Ok(self.hs_div()?.divider())
    }

    pub fn set_hs_div_int(&mut self, divider: u8) -> Result<&mut Self, FieldError> {
        Ok(self.set_hs_div(HsDiv::from_divider(divider)?))
    }

    /// Register 8 is the most significant byte, register 12 the least.
    pub fn rfreq_raw(&self) -> u64 {
        let mut rfreq = (self.buf[Self::IDX_N1_RFREQ] & Self::RFREQ_HIGH_MASK) as u64;
        for byte in &self.buf[Self::IDX_N1_RFREQ + 1..=Self::IDX_RFREQ_LSB] {
            rfreq = (rfreq << 8) | *byte as u64;
        }
        rfreq
    }

    pub fn set_rfreq_raw(&mut self, value: u64) -> Result<&mut Self, FieldError> {
        if value > Self::RFREQ_RAW_MAX {
            return Err(FieldError::OutOfRange {
                field: "RFREQ",
                value,
            });
        }
        let mut remaining = value;
        for idx in (Self::IDX_N1_RFREQ + 1..=Self::IDX_RFREQ_LSB).rev() {
            self.buf[idx] = (remaining & 0xff) as u8;
            remaining >>= 8;
        }
        let top = &mut self.buf[Self::IDX_N1_RFREQ];
        *top = (*top & !Self::RFREQ_HIGH_MASK) | (remaining as u8 & Self::RFREQ_HIGH_MASK);
        Ok(self)
    }

    pub fn rfreq(&self) -> f64 {
        self.rfreq_raw() as f64 / SI570_RFREQ_SCALE
    }

    pub fn set_rfreq(&mut self, value: f64) -> Result<&mut Self, FieldError> {
        let raw = (value * SI570_RFREQ_SCALE).round();
        if !raw.is_finite() || raw < 0.0 || raw > Self::RFREQ_RAW_MAX as f64 {
            return Err(FieldError::NotRepresentable {
                field: "RFREQ",
                value,
            });
        }
        self.set_rfreq_raw(raw as u64)
    }
}
