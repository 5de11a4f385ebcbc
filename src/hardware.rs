pub mod i2c_mux;
pub mod si570;
