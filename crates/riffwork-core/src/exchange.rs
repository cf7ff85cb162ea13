//! The Exchange Snapshot: a fixed-layout, per-tick summary of playback
//! state for consumption by UI, broadcast sinks, and IPC.

use crate::riff::STEM_SLOTS;

/// Number of FFT scope buckets carried in a snapshot.
pub const SCOPE_BUCKETS: usize = 64;

/// Maximum length of the fixed jam-name buffer.
pub const JAM_NAME_LEN: usize = 64;

bitflags::bitflags! {
    /// `data_flags` bitfield: which sub-sections of the
    /// snapshot are meaningfully populated this tick.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DataFlags: u32 {
        /// Playback fields (bpm, bar, percentage, gains, pulses) are valid.
        const PLAYBACK = 0b0000_0001;
        /// Scope (FFT) data is valid.
        const SCOPE = 0b0000_0010;
    }
}

/// Per-tick snapshot of the audible playback state. Value-typed so it can
/// be copied wholesale into an IPC buffer under a mutex;
/// never shared cross-process by reference.
#[derive(Clone, Debug)]
pub struct ExchangeSnapshot {
    pub data_flags: DataFlags,
    pub jam_name: String,
    pub bpm: f32,
    pub scale: u32,
    pub root: u32,
    pub bar_segment_count: u32,
    pub bar_segment_active: u32,
    pub riff_percentage: f32,
    pub riff_transition: f32,
    pub stem_gain: [f32; STEM_SLOTS],
    pub stem_pulse: [f32; STEM_SLOTS],
    pub stem_energy: [f32; STEM_SLOTS],
    pub consensus_beat: f32,
    pub scope: [f32; SCOPE_BUCKETS],
}

impl Default for ExchangeSnapshot {
    fn default() -> Self {
        Self {
            data_flags: DataFlags::empty(),
            jam_name: String::new(),
            bpm: 0.0,
            scale: 0,
            root: 0,
            bar_segment_count: 0,
            bar_segment_active: 0,
            riff_percentage: 0.0,
            riff_transition: 0.0,
            stem_gain: [0.0; STEM_SLOTS],
            stem_pulse: [0.0; STEM_SLOTS],
            stem_energy: [0.0; STEM_SLOTS],
            consensus_beat: 0.0,
            scope: [0.0; SCOPE_BUCKETS],
        }
    }
}

impl ExchangeSnapshot {
    /// Clear all fields back to their silent defaults, preserving the
    /// allocation of `jam_name`'s backing `String` and the fixed arrays.
    /// Called at the start of each main-thread update so a UI frame that runs before the mixer publishes never
    /// observes a torn snapshot.
    pub fn clear(&mut self) {
        self.data_flags = DataFlags::empty();
        self.jam_name.clear();
        self.bpm = 0.0;
        self.scale = 0;
        self.root = 0;
        self.bar_segment_count = 0;
        self.bar_segment_active = 0;
        self.riff_percentage = 0.0;
        self.riff_transition = 0.0;
        self.stem_gain = [0.0; STEM_SLOTS];
        self.stem_pulse = [0.0; STEM_SLOTS];
        self.stem_energy = [0.0; STEM_SLOTS];
        self.consensus_beat = 0.0;
        self.scope = [0.0; SCOPE_BUCKETS];
    }

    /// Truncate a jam name to [`JAM_NAME_LEN`] bytes at a UTF-8 boundary,
    /// matching the fixed-length `jam_name[N]` field this snapshot publishes.
    pub fn set_jam_name(&mut self, name: &str) {
        let mut end = name.len().min(JAM_NAME_LEN);
        while end > 0 && !name.is_char_boundary(end) {
            end -= 1;
        }
        self.jam_name.clear();
        self.jam_name.push_str(&name[..end]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_to_default() {
        let mut snap = ExchangeSnapshot {
            bpm: 120.0,
            data_flags: DataFlags::PLAYBACK,
            ..ExchangeSnapshot::default()
        };
        snap.set_jam_name("my-jam");
        snap.clear();
        assert_eq!(snap.bpm, 0.0);
        assert!(snap.data_flags.is_empty());
        assert!(snap.jam_name.is_empty());
    }

    #[test]
    fn jam_name_truncates_at_char_boundary() {
        let mut snap = ExchangeSnapshot::default();
        let long_name = "x".repeat(JAM_NAME_LEN + 10);
        snap.set_jam_name(&long_name);
        assert_eq!(snap.jam_name.len(), JAM_NAME_LEN);
    }
}
