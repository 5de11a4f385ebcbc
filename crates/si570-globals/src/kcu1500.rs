/// Default character device of the PCIe data driver.
pub const KCU1500_DEVICE_PATH: &str = "/dev/datadev_0";

/// Base of the I2C bridge inside the BAR0 AXI-Lite space.
pub const KCU1500_I2C_BASE: u64 = 0x00E0_0000;

/* Devices behind the I2C bridge, relative to KCU1500_I2C_BASE */
pub const KCU1500_I2C_MUX_OFFSET: u64 = 0x000;
pub const KCU1500_QSFP_OFFSET: u64 = 0x400;
pub const KCU1500_SI570_OFFSET: u64 = 0x800;

/// Frequency, in MHz, the Si570 on this board was factory programmed to.
pub const KCU1500_SI570_FACTORY_MHZ: f64 = 156.25;

/* I2C mux channel select values */
pub const KCU1500_MUX_NONE: u8 = 0x00;
pub const KCU1500_MUX_QSFP1: u8 = 0x02;
pub const KCU1500_MUX_SI570: u8 = 0x04;
pub const KCU1500_MUX_FAN: u8 = 0x08;
pub const KCU1500_MUX_QSFP0: u8 = 0x10;
pub const KCU1500_MUX_EEPROM: u8 = 0x20;
