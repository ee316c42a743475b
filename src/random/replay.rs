//! Byte-stream replay oracle.

use super::{RANDOM01_WIDTH, RandomSource, U32_RANGE, offset_width};
use crate::error::{SimulationError, SimulationResult};

/// Oracle replaying draws from a fixed byte string.
///
/// This is the fuzzing entry point: any byte string is a valid schedule, so
/// a coverage-guided fuzzer mutating bytes is mutating simulated
/// interleavings. Once the cursor cannot satisfy a read the oracle reports
/// [`SimulationError::EndOfInput`], which the driver treats as the natural
/// end of the run.
#[derive(Debug, Clone)]
pub struct ReplayRandom {
    bytes: Vec<u8>,
    cursor: usize,
}

impl ReplayRandom {
    /// Creates an oracle that replays `bytes` from the start.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    fn take(&mut self, width: usize) -> SimulationResult<u64> {
        if self.remaining() < width {
            return Err(SimulationError::EndOfInput);
        }
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(&self.bytes[self.cursor..self.cursor + width]);
        self.cursor += width;
        Ok(u64::from_le_bytes(raw))
    }
}

impl RandomSource for ReplayRandom {
    fn random01(&mut self) -> SimulationResult<f64> {
        let raw = self.take(RANDOM01_WIDTH)?;
        Ok(raw as f64 / U32_RANGE)
    }

    fn random_int(&mut self, lo: i32, hi: i32) -> SimulationResult<i32> {
        debug_assert!(lo < hi, "random_int requires lo < hi, got {lo}..{hi}");
        let span = (i64::from(hi) - i64::from(lo)) as u64;
        let offset = self.take(offset_width(span))?;
        // The encoded offset can exceed the span (e.g. 0xFF for a span of
        // 100), so clamp into [lo, hi).
        let clamped = offset.min(span - 1);
        Ok((i64::from(lo) + clamped as i64) as i32)
    }
}
