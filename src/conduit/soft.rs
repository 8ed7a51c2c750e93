//! In-process ChaCha20 conduit with write mixing.
//!
//! For hosts without a writable random device. The generator is seeded
//! from OS entropy, and every write is folded into the seed material so
//! that client challenges perturb all later output.
//!
//! # Mixing Model
//!
//! A write derives the next seed with BLAKE3 over:
//! - A domain separator
//! - The mix counter
//! - The previous seed material
//! - The written bytes
//!
//! The written bytes can only add to the state. An attacker who controls
//! every write still cannot predict output without the OS-derived seed.

use super::{Conduit, ConduitError};
use blake3::Hasher;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::sync::{Mutex, MutexGuard};

/// Domain separator for write mixing.
const MIX_DOMAIN: &[u8] = b"pollen-soft-conduit-mix-v1";

struct SoftState {
    inner: ChaCha20Rng,
    /// Retained seed material for mixing. This is NOT the ChaCha internal state.
    seed_material: [u8; 32],
    mix_count: u64,
    bytes_since_mix: u64,
}

/// Software conduit backed by ChaCha20.
///
/// The generator is not safe for unsynchronized use, so each write and
/// each read holds an internal lock for its duration.
pub struct SoftConduit {
    state: Mutex<SoftState>,
}

impl SoftConduit {
    /// Creates a conduit seeded from the OS entropy source.
    pub fn from_os_entropy() -> Self {
        let mut seed = [0u8; 32];
        rand_core::OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Creates a conduit from a known seed.
    ///
    /// Output is fully determined by the seed and the sequence of writes,
    /// which makes this useful for reproducible tests.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            state: Mutex::new(SoftState {
                inner: ChaCha20Rng::from_seed(seed),
                seed_material: seed,
                mix_count: 0,
                bytes_since_mix: 0,
            }),
        }
    }

    /// Returns the number of writes mixed into the generator.
    pub fn mix_count(&self) -> u64 {
        self.lock().mix_count
    }

    /// Returns bytes read since the last write.
    pub fn bytes_since_mix(&self) -> u64 {
        self.lock().bytes_since_mix
    }

    fn lock(&self) -> MutexGuard<'_, SoftState> {
        // A panic mid-operation cannot leave the generator half-updated
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Conduit for SoftConduit {
    fn write(&self, bytes: &[u8]) -> Result<(), ConduitError> {
        let mut state = self.lock();

        // new_seed = BLAKE3(domain || counter || old_seed_material || bytes)
        let mut hasher = Hasher::new();
        hasher.update(MIX_DOMAIN);
        hasher.update(&state.mix_count.to_le_bytes());
        hasher.update(&state.seed_material);
        hasher.update(bytes);

        let seed: [u8; 32] = *hasher.finalize().as_bytes();

        state.seed_material = seed;
        state.inner = ChaCha20Rng::from_seed(seed);
        state.mix_count += 1;
        state.bytes_since_mix = 0;

        tracing::trace!(
            mix_count = state.mix_count,
            bytes = bytes.len(),
            "Mixed bytes into software conduit"
        );

        Ok(())
    }

    fn read_full(&self, n: usize) -> Result<Vec<u8>, ConduitError> {
        let mut state = self.lock();
        let mut buf = vec![0u8; n];
        state.inner.fill_bytes(&mut buf);
        state.bytes_since_mix += n as u64;
        Ok(buf)
    }
}

impl std::fmt::Debug for SoftConduit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SoftConduit")
            .field("mix_count", &state.mix_count)
            .field("bytes_since_mix", &state.bytes_since_mix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_increments_mix_count() {
        let conduit = SoftConduit::from_os_entropy();
        assert_eq!(conduit.mix_count(), 0);

        conduit.write(&[0x42u8; 64]).unwrap();

        assert_eq!(conduit.mix_count(), 1);
    }

    #[test]
    fn test_bytes_since_mix_tracking() {
        let conduit = SoftConduit::from_os_entropy();

        conduit.read_full(100).unwrap();
        assert_eq!(conduit.bytes_since_mix(), 100);

        conduit.write(b"reset").unwrap();
        assert_eq!(conduit.bytes_since_mix(), 0);
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = SoftConduit::from_seed([0x01u8; 32]);
        let b = SoftConduit::from_seed([0x01u8; 32]);

        assert_eq!(a.read_full(64).unwrap(), b.read_full(64).unwrap());
    }

    #[test]
    fn test_write_changes_output() {
        let a = SoftConduit::from_seed([0x01u8; 32]);
        let b = SoftConduit::from_seed([0x01u8; 32]);

        a.write(&[0xABu8; 64]).unwrap();

        assert_ne!(a.read_full(64).unwrap(), b.read_full(64).unwrap());
    }

    #[test]
    fn test_different_writes_different_output() {
        let a = SoftConduit::from_seed([0x01u8; 32]);
        let b = SoftConduit::from_seed([0x01u8; 32]);

        a.write(&[0xAAu8; 64]).unwrap();
        b.write(&[0xBBu8; 64]).unwrap();

        assert_ne!(a.read_full(64).unwrap(), b.read_full(64).unwrap());
    }

    #[test]
    fn test_mix_counter_affects_output() {
        let a = SoftConduit::from_seed([0x01u8; 32]);
        let b = SoftConduit::from_seed([0x01u8; 32]);

        a.write(&[0xAAu8; 64]).unwrap();

        // Same final write, but b has mixed once before
        b.write(&[0x00u8; 64]).unwrap();
        b.write(&[0xAAu8; 64]).unwrap();

        assert_ne!(a.read_full(64).unwrap(), b.read_full(64).unwrap());
    }
}
