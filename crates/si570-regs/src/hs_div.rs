use crate::FieldError;
use std::fmt;

/// High speed divider taking the DCO output as its clock input.
///
/// Discriminants are the 3 bit register encodings. Codes 4 and 6 are not
/// used by the device.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HsDiv {
    Div4 = 0,
    Div5 = 1,
    Div6 = 2,
    Div7 = 3,
    Div9 = 5,
    Div11 = 7,
}

impl HsDiv {
    pub const ALL: [HsDiv; 6] = [
        HsDiv::Div4,
        HsDiv::Div5,
        HsDiv::Div6,
        HsDiv::Div7,
        HsDiv::Div9,
        HsDiv::Div11,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn divider(self) -> u8 {
        match self {
            HsDiv::Div4 => 4,
            HsDiv::Div5 => 5,
            HsDiv::Div6 => 6,
            HsDiv::Div7 => 7,
            HsDiv::Div9 => 9,
            HsDiv::Div11 => 11,
        }
    }

    pub fn from_divider(divider: u8) -> Result<Self, FieldError> {
        Self::ALL
            .into_iter()
            .find(|hs_div| hs_div.divider() == divider)
            .ok_or(FieldError::OutOfRange {
                field: "HS_DIV",
                value: divider as u64,
            })
    }
}

impl TryFrom<u8> for HsDiv {
    type Error = FieldError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(HsDiv::Div4),
            1 => Ok(HsDiv::Div5),
            2 => Ok(HsDiv::Div6),
            3 => Ok(HsDiv::Div7),
            5 => Ok(HsDiv::Div9),
            7 => Ok(HsDiv::Div11),
            _ => {
                log::error!("reserved HS_DIV code {code}");
                Err(FieldError::InvalidEncoding {
                    field: "HS_DIV",
                    raw: code,
                })
            }
        }
    }
}

impl fmt::Display for HsDiv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.divider())
    }
}
