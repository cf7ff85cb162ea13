//! Decoded stem audio: the leaf of the playback graph.
//!
//! A [`Stem`] is immutable once constructed — it is produced once by the
//! fetch pipeline's decode stage (see `riffwork-pipeline`), then shared
//! (via [`SharedStem`]) between the [`riffwork_cache`](../riffwork_cache)
//! cache and every live `Riff` that references it.

use std::sync::Arc;

use crate::ids::StemId;

/// Number of samples represented by a single word of [`Stem::beat_bits`].
pub const BEAT_BITS_PER_WORD: u64 = 64;

/// Shared, reference-counted handle to a decoded [`Stem`].
///
/// The cache is the strong-reference anchor; riffs hold additional strong
/// references while a stem is part of their playback graph. There is
/// deliberately no back-pointer from `Stem` to its owner(s).
pub type SharedStem = Arc<Stem>;

/// Decoded loop audio for one layer of a riff.
///
/// Immutable after construction. A stem that failed to decode is still
/// represented as a `Stem` (with `failed = true` and empty buffers) rather
/// than `Option<Stem>`, so a riff's eight stem slots can hold a uniform
/// type — `None` means "no stem authored for this slot", `Some(failed)`
/// means "a stem was authored but could not be played".
#[derive(Debug)]
pub struct Stem {
    stem_id: StemId,
    sample_rate: u32,
    sample_count: usize,
    channels: [Vec<f32>; 2],
    bps: f32,
    beat_bits: Vec<u64>,
    energy: Vec<f32>,
    analysis_ready: bool,
    failed: bool,
}

impl Stem {
    /// Construct a successfully decoded stem. `left`/`right` must have
    /// equal length; `beat_bits` and `energy` are filled in once analysis
    /// completes (see [`Stem::with_analysis`]) and otherwise left empty.
    pub fn new(stem_id: StemId, sample_rate: u32, bps: f32, left: Vec<f32>, right: Vec<f32>) -> Self {
        debug_assert_eq!(left.len(), right.len(), "stem channels must have equal length");
        let sample_count = left.len();
        Self {
            stem_id,
            sample_rate,
            sample_count,
            channels: [left, right],
            bps,
            beat_bits: Vec::new(),
            energy: Vec::new(),
            analysis_ready: false,
            failed: false,
        }
    }

    /// Construct a placeholder for a stem that failed to decode. Zero
    /// length, silent, `failed = true` — mixed exactly like an empty slot
    /// but retained in the cache to avoid immediate re-decode thrash.
    pub fn failed(stem_id: StemId) -> Self {
        Self {
            stem_id,
            sample_rate: 0,
            sample_count: 0,
            channels: [Vec::new(), Vec::new()],
            bps: 0.0,
            beat_bits: Vec::new(),
            energy: Vec::new(),
            analysis_ready: false,
            failed: true,
        }
    }

    /// Attach beat-bitmap and energy-envelope analysis, completing the
    /// stem. Both arrays must be consistent with `sample_count`.
    pub fn with_analysis(mut self, beat_bits: Vec<u64>, energy: Vec<f32>) -> Self {
        debug_assert_eq!(
            energy.len(),
            self.sample_count,
            "energy envelope must have one sample per audio sample"
        );
        self.beat_bits = beat_bits;
        self.energy = energy;
        self.analysis_ready = true;
        self
    }

    pub const fn stem_id(&self) -> &StemId {
        &self.stem_id
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub const fn bps(&self) -> f32 {
        self.bps
    }

    pub const fn analysis_ready(&self) -> bool {
        self.analysis_ready
    }

    pub const fn failed(&self) -> bool {
        self.failed
    }

    /// Left/right sample at `index`, or silence if the stem failed or the
    /// index is out of range. Callers in the mix engine are expected to
    /// already have wrapped `index` modulo `sample_count`; this is a
    /// belt-and-braces bound check, not the tiling logic itself.
    #[inline]
    pub fn sample(&self, index: usize) -> (f32, f32) {
        if self.failed || index >= self.sample_count {
            return (0.0, 0.0);
        }
        (self.channels[0][index], self.channels[1][index])
    }

    /// Whether a beat falls exactly at `sample_index`.
    #[inline]
    pub fn beat_at(&self, sample_index: usize) -> bool {
        if self.beat_bits.is_empty() {
            return false;
        }
        let word = sample_index / BEAT_BITS_PER_WORD as usize;
        let bit = sample_index % BEAT_BITS_PER_WORD as usize;
        self.beat_bits
            .get(word)
            .is_some_and(|w| (w >> bit) & 1 == 1)
    }

    /// Energy envelope sample at `sample_index`, normalised to `[0, 1]`.
    #[inline]
    pub fn energy_at(&self, sample_index: usize) -> f32 {
        self.energy.get(sample_index).copied().unwrap_or(0.0)
    }

    /// Rough resident memory footprint in bytes: two f32 channel buffers
    /// plus analysis overhead.
    pub fn estimated_bytes(&self) -> u64 {
        let channel_bytes = self.sample_count as u64 * 8; // 2 channels * 4 bytes
        let beat_bytes = (self.beat_bits.len() * std::mem::size_of::<u64>()) as u64;
        let energy_bytes = (self.energy.len() * std::mem::size_of::<f32>()) as u64;
        channel_bytes + beat_bytes + energy_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_id() -> StemId {
        StemId::from_str_lossy("test-stem")
    }

    #[test]
    fn failed_stem_is_silent() {
        let stem = Stem::failed(test_id());
        assert!(stem.failed());
        assert_eq!(stem.sample(0), (0.0, 0.0));
        assert!(!stem.beat_at(0));
    }

    #[test]
    fn beat_bitmap_bit_layout() {
        let left = vec![0.0; 200];
        let right = vec![0.0; 200];
        // Set bit 0 (sample 0) and bit 65 (sample 65, word 1 bit 1).
        let beat_bits = vec![0b1, 0b10];
        let energy = vec![0.0; 200];
        let stem = Stem::new(test_id(), 44100, 120.0, left, right).with_analysis(beat_bits, energy);

        assert!(stem.beat_at(0));
        assert!(!stem.beat_at(1));
        assert!(stem.beat_at(65));
        assert!(!stem.beat_at(64));
    }

    #[test]
    fn estimated_bytes_scales_with_sample_count() {
        let left = vec![0.0; 1000];
        let right = vec![0.0; 1000];
        let stem = Stem::new(test_id(), 44100, 120.0, left, right);
        assert_eq!(stem.estimated_bytes(), 1000 * 8);
    }
}
