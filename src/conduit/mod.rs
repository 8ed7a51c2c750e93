//! Randomness conduits.
//!
//! A conduit is a duplex byte channel over a source of randomness. Bytes
//! written into it are contributed to the source's internal state; bytes
//! read from it are fresh random output. The service holds exactly one
//! conduit for its whole lifetime and shares it between every request.
//!
//! Implementations must tolerate concurrent use through `&self`. The
//! device conduit relies on the kernel to serialize access to the
//! character device; the software conduit serializes internally.

mod device;
mod mock;
mod soft;

pub use device::DeviceConduit;
pub use mock::MockConduit;
pub use soft::SoftConduit;

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during conduit operations.
#[derive(Debug, Error)]
pub enum ConduitError {
    /// The device could not be opened read-write.
    #[error("failed to open random device {path}: {source}")]
    Open {
        /// Device path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Contributing bytes failed.
    #[error("failed to write to random device: {0}")]
    Write(#[source] std::io::Error),
    /// Reading failed before the sample was complete.
    #[error("failed to read from random device: {0}")]
    Read(#[source] std::io::Error),
    /// The device reached end of stream early.
    #[error("short read from random device: got {got} of {want} bytes")]
    ShortRead {
        /// Bytes obtained.
        got: usize,
        /// Bytes requested.
        want: usize,
    },
    /// The blocking task running the operation did not complete.
    #[error("device task failed: {0}")]
    Task(String),
}

/// Trait for randomness conduits.
///
/// `read_full` must either return exactly `n` bytes or fail. It never
/// pads, truncates, or retries on behalf of the caller.
pub trait Conduit: Send + Sync {
    /// Contributes bytes to the randomness source.
    fn write(&self, bytes: &[u8]) -> Result<(), ConduitError>;

    /// Reads exactly `n` random bytes, blocking until they are available.
    fn read_full(&self, n: usize) -> Result<Vec<u8>, ConduitError>;
}

/// Which conduit backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConduitKind {
    /// A character device such as `/dev/random`, opened read-write.
    #[default]
    Device,
    /// In-process ChaCha20 generator with BLAKE3 write mixing.
    Software,
}

/// Opens the conduit selected by `kind`.
///
/// `device` is only consulted for [`ConduitKind::Device`].
pub fn open(kind: ConduitKind, device: &Path) -> Result<Arc<dyn Conduit>, ConduitError> {
    match kind {
        ConduitKind::Device => Ok(Arc::new(DeviceConduit::open(device)?)),
        ConduitKind::Software => {
            tracing::info!("Using in-process software conduit");
            Ok(Arc::new(SoftConduit::from_os_entropy()))
        }
    }
}

/// Reads exactly `want` bytes from `reader`.
///
/// End of stream before `want` bytes is reported as
/// [`ConduitError::ShortRead`] together with the number of bytes obtained.
pub(crate) fn fill_exact<R: Read>(mut reader: R, want: usize) -> Result<Vec<u8>, ConduitError> {
    let mut buf = vec![0u8; want];
    let mut got = 0;

    while got < want {
        match reader.read(&mut buf[got..]) {
            Ok(0) => return Err(ConduitError::ShortRead { got, want }),
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConduitError::Read(e)),
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fill_exact_reads_requested_length() {
        let source = Cursor::new((0u8..=255).collect::<Vec<_>>());
        let bytes = fill_exact(source, 64).unwrap();

        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes[63], 63);
    }

    #[test]
    fn test_fill_exact_reports_short_read() {
        let source = Cursor::new(vec![0xAAu8; 10]);

        assert!(matches!(
            fill_exact(source, 64),
            Err(ConduitError::ShortRead { got: 10, want: 64 })
        ));
    }

    #[test]
    fn test_open_software_conduit() {
        let conduit = open(ConduitKind::Software, Path::new("/nonexistent")).unwrap();
        assert_eq!(conduit.read_full(32).unwrap().len(), 32);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = open(ConduitKind::Device, Path::new("/nonexistent/pollen/random"));
        assert!(matches!(result, Err(ConduitError::Open { .. })));
    }
}
