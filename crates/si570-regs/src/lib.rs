pub mod config_image;
pub mod hs_div;

pub use config_image::ConfigImage;
pub use hs_div::HsDiv;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FieldError {
    /// A raw bit pattern has no meaning for the field it was read from.
    #[error("invalid {field} encoding {raw:#x}")]
    InvalidEncoding { field: &'static str, raw: u8 },
    /// The value does not fit into the bits the field owns.
    #[error("{field} value {value} out of range")]
    OutOfRange { field: &'static str, value: u64 },
    #[error("{field} value {value} not representable")]
    NotRepresentable { field: &'static str, value: f64 },
    /// Register is not part of the configuration image.
    #[error("register {0} not in configuration image")]
    NotInImage(u8),
}
