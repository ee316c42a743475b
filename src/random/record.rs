//! Recording proxy oracle.

use super::{RandomSource, U32_RANGE, offset_width};
use crate::error::SimulationResult;

/// Oracle that delegates to an inner source and records every draw.
///
/// The recorded bytes fed back through [`super::ReplayRandom`] reproduce the
/// inner oracle's draw sequence, and with it the whole simulation run. This
/// is how a crash found under a seed becomes a standalone regression input.
#[derive(Debug, Clone)]
pub struct RecordingRandom<R> {
    inner: R,
    bytes: Vec<u8>,
}

impl<R: RandomSource> RecordingRandom<R> {
    /// Wraps `inner`, starting with an empty recording.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes: Vec::new(),
        }
    }

    /// The byte encoding of every draw made so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the proxy, returning the recording.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl<R: RandomSource> RandomSource for RecordingRandom<R> {
    fn random01(&mut self) -> SimulationResult<f64> {
        let value = self.inner.random01()?;
        let grid = (value * U32_RANGE) as u32;
        self.bytes.extend_from_slice(&grid.to_le_bytes());
        Ok(value)
    }

    fn random_int(&mut self, lo: i32, hi: i32) -> SimulationResult<i32> {
        let value = self.inner.random_int(lo, hi)?;
        let span = (i64::from(hi) - i64::from(lo)) as u64;
        let offset = (i64::from(value) - i64::from(lo)) as u64;
        let width = offset_width(span);
        self.bytes.extend_from_slice(&offset.to_le_bytes()[..width]);
        Ok(value)
    }
}
