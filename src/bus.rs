use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 32 bit AXI-Lite register access.
///
/// Handles are cheap to clone so several devices on the same bridge can each hold one.
pub trait Bus {
    fn read_u32(&self, addr: u64) -> Result<u32>;
    fn write_u32(&self, addr: u64, value: u32) -> Result<()>;
}

/// Register space of the PCIe card, accessed with positioned reads and writes on the
/// driver's character device.
#[derive(Clone, Debug)]
pub struct PcieBus {
    file: Arc<File>,
    path: PathBuf,
}

impl PcieBus {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        log::debug!("Opened register space {}", path.display());
        Ok(Self {
            file: Arc::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Bus for PcieBus {
    fn read_u32(&self, addr: u64) -> Result<u32> {
        let mut word = [0u8; 4];
        self.file
            .read_exact_at(&mut word, addr)
            .map_err(|source| Error::DeviceIo { addr, source })?;
        let value = u32::from_le_bytes(word);
        log::trace!("Read {value:#010x} from {addr:#x}");
        Ok(value)
    }

    fn write_u32(&self, addr: u64, value: u32) -> Result<()> {
        self.file
            .write_all_at(&value.to_le_bytes(), addr)
            .map_err(|source| Error::DeviceIo { addr, source })?;
        log::trace!("Wrote {value:#010x} to {addr:#x}");
        Ok(())
    }
}
