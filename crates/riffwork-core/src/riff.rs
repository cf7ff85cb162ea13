//! The riff: eight stem slots plus the timing details that let the mix
//! engine place every sample correctly in musical time.

use std::sync::Arc;

use crate::ids::RiffId;
use crate::stem::SharedStem;

/// Every riff has exactly this many stem slots.
pub const STEM_SLOTS: usize = 8;

/// Shared, reference-counted handle to a [`Riff`].
pub type SharedRiff = Arc<Riff>;

/// A fully-resolved riff: eight (possibly empty) stem slots and the
/// per-stem playback parameters needed to mix them, plus the overall
/// timing of the loop at the device's sample rate.
///
/// Immutable after construction — produced once by the fetch pipeline,
/// then handed to the mix engine as current or next. `length_in_samples`
/// may be `0` for a riff with no resolvable stems; such a riff must never
/// be promoted to "current".
#[derive(Debug, Clone)]
pub struct Riff {
    riff_id: RiffId,
    bpm: f32,
    quarter_beats: u32,
    bar_count: u32,
    length_in_samples: u64,
    sample_rate: u32,
    stems: [Option<SharedStem>; STEM_SLOTS],
    stem_time_scales: [f32; STEM_SLOTS],
    stem_gains: [f32; STEM_SLOTS],
    stem_repetitions: [u32; STEM_SLOTS],
    cid_hash: u64,
}

impl Riff {
    /// Construct a riff shell with timing fixed, then fill stem slots via
    /// [`Riff::with_stem`]. `bar_count` must be non-zero; `length_in_samples`
    /// is expected to be an exact multiple of `bar_count` (debug-asserted)
    /// and may be `0` for an unresolvable riff.
    pub fn new(
        riff_id: RiffId,
        bpm: f32,
        quarter_beats: u32,
        bar_count: u32,
        length_in_samples: u64,
        sample_rate: u32,
        cid_hash: u64,
    ) -> Self {
        assert!(bar_count > 0, "bar_count must be non-zero");
        debug_assert!(
            length_in_samples == 0 || length_in_samples % u64::from(bar_count) == 0,
            "length_in_samples must divide evenly into bar_count bars"
        );
        Self {
            riff_id,
            bpm,
            quarter_beats,
            bar_count,
            length_in_samples,
            sample_rate,
            stems: Default::default(),
            stem_time_scales: [1.0; STEM_SLOTS],
            stem_gains: [1.0; STEM_SLOTS],
            stem_repetitions: [1; STEM_SLOTS],
            cid_hash,
        }
    }

    /// Fill one of the eight stem slots.
    #[must_use]
    pub fn with_stem(
        mut self,
        slot: usize,
        stem: Option<SharedStem>,
        time_scale: f32,
        gain: f32,
        repetitions: u32,
    ) -> Self {
        assert!(slot < STEM_SLOTS, "stem slot out of range");
        self.stems[slot] = stem;
        self.stem_time_scales[slot] = time_scale;
        self.stem_gains[slot] = gain.clamp(0.0, 1.0);
        self.stem_repetitions[slot] = repetitions.max(1);
        self
    }

    pub const fn riff_id(&self) -> &RiffId {
        &self.riff_id
    }

    pub const fn bpm(&self) -> f32 {
        self.bpm
    }

    pub const fn quarter_beats(&self) -> u32 {
        self.quarter_beats
    }

    pub const fn bar_count(&self) -> u32 {
        self.bar_count
    }

    pub const fn length_in_samples(&self) -> u64 {
        self.length_in_samples
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn cid_hash(&self) -> u64 {
        self.cid_hash
    }

    /// Whether this riff has no playable content — must never be promoted
    /// to "current".
    pub const fn is_silent_shell(&self) -> bool {
        self.length_in_samples == 0
    }

    /// Exact length of one bar, in samples. `0` when the riff is a silent shell.
    pub const fn length_in_samples_per_bar(&self) -> u64 {
        if self.bar_count == 0 {
            0
        } else {
            self.length_in_samples / self.bar_count as u64
        }
    }

    pub fn length_in_sec(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.length_in_samples as f32 / self.sample_rate as f32
        }
    }

    pub fn length_in_sec_per_bar(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.length_in_samples_per_bar() as f32 / self.sample_rate as f32
        }
    }

    /// Longest stem's native length expressed in riff-bars, used by the
    /// disk recorder's loop-repeat counter (RepCom).
    pub fn longest_stem_in_bars(&self) -> u32 {
        let bar_samples = self.length_in_samples_per_bar();
        if bar_samples == 0 {
            return 0;
        }
        self.stems
            .iter()
            .enumerate()
            .filter_map(|(slot, stem)| stem.as_ref().map(|s| (slot, s)))
            .map(|(slot, stem)| {
                let scaled = stem.sample_count() as f64 / f64::from(self.stem_time_scales[slot]);
                (scaled / bar_samples as f64).ceil() as u32
            })
            .max()
            .unwrap_or(0)
    }

    pub fn stem(&self, slot: usize) -> Option<&SharedStem> {
        self.stems[slot].as_ref()
    }

    pub fn stems(&self) -> &[Option<SharedStem>; STEM_SLOTS] {
        &self.stems
    }

    pub fn stem_time_scale(&self, slot: usize) -> f32 {
        self.stem_time_scales[slot]
    }

    pub fn stem_gain(&self, slot: usize) -> f32 {
        self.stem_gains[slot]
    }

    pub fn stem_repetitions(&self, slot: usize) -> u32 {
        self.stem_repetitions[slot]
    }

    /// Map a riff-relative sample position (already wrapped modulo
    /// `length_in_samples`) to a sample index inside stem `slot`'s own
    /// buffer, tiling via modulo so a stem shorter than the riff repeats
    /// to fill it. Returns `None` for an empty or failed slot.
    pub fn stem_sample_index(&self, slot: usize, riff_sample: u64) -> Option<usize> {
        let stem = self.stems[slot].as_ref()?;
        if stem.failed() || stem.sample_count() == 0 {
            return None;
        }
        let scaled = (riff_sample as f64) * f64::from(self.stem_time_scales[slot]);
        Some((scaled as u64 % stem.sample_count() as u64) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stem::Stem;

    fn stem_with_len(n: usize) -> SharedStem {
        Arc::new(Stem::new(
            crate::ids::StemId::from_str_lossy("s"),
            44100,
            120.0,
            vec![0.0; n],
            vec![0.0; n],
        ))
    }

    #[test]
    fn bar_math_invariant_holds() {
        let riff = Riff::new(RiffId::from_str_lossy("r"), 120.0, 4, 8, 88200, 44100, 0);
        assert_eq!(riff.length_in_samples_per_bar() * 8, riff.length_in_samples());
    }

    #[test]
    fn silent_shell_has_zero_length() {
        let riff = Riff::new(RiffId::from_str_lossy("r"), 0.0, 4, 8, 0, 44100, 0);
        assert!(riff.is_silent_shell());
        assert_eq!(riff.length_in_samples_per_bar(), 0);
    }

    #[test]
    fn stem_index_tiles_via_modulo() {
        let riff = Riff::new(RiffId::from_str_lossy("r"), 120.0, 4, 8, 800, 44100, 0)
            .with_stem(0, Some(stem_with_len(300)), 1.0, 1.0, 1);
        // riff_sample 650 tiles to 650 % 300 = 50
        assert_eq!(riff.stem_sample_index(0, 650), Some(50));
    }

    #[test]
    fn time_scaled_stem_index_floors_the_scaled_position() {
        let riff = Riff::new(RiffId::from_str_lossy("r"), 120.0, 4, 8, 800, 44100, 0)
            .with_stem(0, Some(stem_with_len(1000)), 2.0, 1.0, 1);
        assert_eq!(riff.stem_sample_index(0, 10), Some(20));
    }

    #[test]
    fn empty_slot_yields_no_index() {
        let riff = Riff::new(RiffId::from_str_lossy("r"), 120.0, 4, 8, 800, 44100, 0);
        assert_eq!(riff.stem_sample_index(0, 10), None);
    }
}
