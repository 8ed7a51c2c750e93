//! Scriptable conduit for tests.

use super::{fill_exact, Conduit, ConduitError};
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Mock conduit that produces a deterministic byte pattern.
///
/// Faults can be scripted per instance: every write failing, every read
/// failing, or every read coming up `missing` bytes short. Call counters
/// let tests assert whether the conduit was touched at all.
#[derive(Debug, Default)]
pub struct MockConduit {
    fail_writes: bool,
    fail_reads: bool,
    short_by: usize,
    writes: AtomicUsize,
    reads: AtomicUsize,
    sequence: AtomicU64,
}

impl MockConduit {
    /// Creates a mock that succeeds on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Makes every read fail with an I/O error.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Makes every read reach end of stream `missing` bytes early.
    pub fn short_reads(mut self, missing: usize) -> Self {
        self.short_by = missing;
        self
    }

    /// Number of write calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of read calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Conduit for MockConduit {
    fn write(&self, _bytes: &[u8]) -> Result<(), ConduitError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.fail_writes {
            return Err(ConduitError::Write(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mock write failure",
            )));
        }
        Ok(())
    }

    fn read_full(&self, n: usize) -> Result<Vec<u8>, ConduitError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.fail_reads {
            return Err(ConduitError::Read(io::Error::new(
                io::ErrorKind::Other,
                "mock read failure",
            )));
        }

        let available = n.saturating_sub(self.short_by) as u64;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        // Deterministic pattern mixed with the read sequence.
        // NOT for entropy - only for exercising callers.
        let pattern: Vec<u8> = (0..n as u64)
            .map(|i| (i.wrapping_mul(167) ^ sequence.wrapping_mul(31)) as u8)
            .collect();

        fill_exact(io::Cursor::new(pattern).take(available), n)
    }
}
