use anyhow::{bail, Result};

/// One planned chunk: inclusive byte offsets within the source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    /// Inclusive bounds, so a range always covers at least one byte.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Partition `[0, total_size)` into fixed-size ranges.
/// All ranges but the last have length `max_chunk_size`; the last carries the
/// remainder. Deterministic for given inputs.
pub fn plan(total_size: u64, max_chunk_size: u64) -> Result<Vec<ChunkRange>> {
    if total_size == 0 {
        bail!("cannot plan chunks for an empty file");
    }
    if max_chunk_size == 0 {
        bail!("chunk size must be non-zero");
    }
    let count = total_size.div_ceil(max_chunk_size);
    let mut ranges = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = i * max_chunk_size;
        let end = ((i + 1) * max_chunk_size).min(total_size) - 1;
        ranges.push(ChunkRange { start, end });
    }
    Ok(ranges)
}
