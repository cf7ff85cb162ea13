//! Builds the Exchange Snapshot once per UI tick from the mixer's
//! published [`MixerStateSnapshot`] plus a windowed FFT pass over the
//! most recently rendered stereo block.
//!
//! The FFT wrapper mirrors `sonido-analysis::fft::Fft`'s shape (windowed
//! forward transform, cached plan) trimmed to the one thing the Exchange
//! needs: a magnitude spectrum folded into a fixed bucket count. None of
//! this runs on the audio thread — the caller hands in the block the
//! engine already wrote to the device this callback.

use std::f32::consts::PI;
use std::sync::Arc;

use riffwork_core::{DataFlags, ExchangeSnapshot, SCOPE_BUCKETS};
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::engine::MixerStateSnapshot;
use crate::event::StemAmalgam;

fn hann(buffer: &mut [Complex32]) {
    let n = buffer.len();
    for (i, sample) in buffer.iter_mut().enumerate() {
        let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos());
        *sample *= w;
    }
}

/// Builds [`ExchangeSnapshot`]s once per UI tick. Owns a cached rustfft
/// plan sized to the scope analysis window, so repeated calls never
/// allocate a new plan.
pub struct ExchangeBuilder {
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl ExchangeBuilder {
    /// `window_size` is the number of trailing mono samples folded into
    /// the FFT each tick; rounded up to the next even size `rustfft`
    /// accepts cleanly relative to [`SCOPE_BUCKETS`].
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        let size = window_size.max(SCOPE_BUCKETS * 2);
        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch = vec![Complex32::new(0.0, 0.0); size];
        Self { fft, scratch }
    }

    /// Populate `snapshot` from the mixer's latest published state and the
    /// interleaved stereo block it just rendered.
    ///
    /// `jam_name` and `amalgam` come from whatever owns the current
    /// jam/riff context on the main thread; `amalgam` is `None` until the
    /// pipeline's per-stem analysis settles for the current riff, in
    /// which case the mixer's own decaying pulse tracker is used instead.
    pub fn populate(
        &mut self,
        snapshot: &mut ExchangeSnapshot,
        state: &MixerStateSnapshot,
        jam_name: &str,
        interleaved_stereo: &[f32],
        amalgam: Option<&StemAmalgam>,
    ) {
        snapshot.clear();

        if let Some(riff) = &state.current_riff {
            snapshot.data_flags |= DataFlags::PLAYBACK;
            snapshot.set_jam_name(jam_name);
            snapshot.bpm = riff.bpm();
            snapshot.bar_segment_count = state.bar_segment_count;
            snapshot.bar_segment_active = state.bar_segment_active;
            snapshot.riff_percentage = state.riff_percentage;
            snapshot.riff_transition = state.riff_transition;
            snapshot.stem_gain = state.stem_gain;
            snapshot.stem_energy = state.stem_energy;
            snapshot.stem_pulse = amalgam.map_or(state.stem_pulse, |a| a.pulse);
            snapshot.consensus_beat = state.consensus_beat;
        }

        if self.compute_scope(interleaved_stereo, &mut snapshot.scope) {
            snapshot.data_flags |= DataFlags::SCOPE;
        }
    }

    /// Downmix to mono, window, FFT, and fold the magnitude spectrum into
    /// `out`'s `SCOPE_BUCKETS` evenly-spaced buckets. Leaves `out`
    /// untouched and returns `false` if fewer frames were supplied than
    /// the analysis window needs.
    fn compute_scope(&mut self, interleaved_stereo: &[f32], out: &mut [f32; SCOPE_BUCKETS]) -> bool {
        let n = self.scratch.len();
        let frames = interleaved_stereo.len() / 2;
        if frames < n {
            return false;
        }

        let start_frame = frames - n;
        for i in 0..n {
            let l = interleaved_stereo[(start_frame + i) * 2];
            let r = interleaved_stereo[(start_frame + i) * 2 + 1];
            self.scratch[i] = Complex32::new((l + r) * 0.5, 0.0);
        }
        hann(&mut self.scratch);
        self.fft.process(&mut self.scratch);

        let half = (n / 2).max(1);
        let bucket_width = (half / SCOPE_BUCKETS).max(1);
        for (bucket, value) in out.iter_mut().enumerate() {
            let start = (bucket * bucket_width).min(half);
            let end = (start + bucket_width).min(half);
            if start >= end {
                *value = 0.0;
                continue;
            }
            let sum: f32 = self.scratch[start..end].iter().map(Complex32::norm).sum();
            *value = sum / (end - start) as f32;
        }
        true
    }
}
