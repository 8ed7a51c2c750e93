//! Character-device conduit.

use super::{fill_exact, Conduit, ConduitError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Conduit over a random device opened read-write for the process lifetime.
///
/// Every operation goes through `&File`, so each write and each read is
/// issued straight to the kernel. No application-level lock is taken; the
/// device serializes concurrent callers itself.
#[derive(Debug)]
pub struct DeviceConduit {
    file: File,
    path: PathBuf,
}

impl DeviceConduit {
    /// Opens the device at `path` in read-write mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConduitError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ConduitError::Open {
                path: path.display().to_string(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Random device opened");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Returns the device path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Conduit for DeviceConduit {
    fn write(&self, bytes: &[u8]) -> Result<(), ConduitError> {
        (&self.file).write_all(bytes).map_err(ConduitError::Write)
    }

    fn read_full(&self, n: usize) -> Result<Vec<u8>, ConduitError> {
        fill_exact(&self.file, n)
    }
}
