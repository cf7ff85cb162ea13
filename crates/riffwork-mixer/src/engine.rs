//! The mix engine itself: the audio-thread-owned [`MixEngine`] and its
//! non-audio-thread [`MixEngineHandle`].
//!
//! Every mutation crosses from the handle to the engine as a tagged
//! command over a preallocated `rtrb` ring — the engine never takes a lock shared with another
//! thread, and never allocates once built.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use riffwork_core::{OperationId, Permutation, Riff, RiffId, SharedRiff, STEM_SLOTS};
use riffwork_io::{DiskRecorder, RecordingRequest};

use crate::command::{MixCommand, MixCommandKind};
use crate::error::{MixerError, Result};
use crate::event::{self, EventReceiver, EventSender, MixerEvent};
use crate::insert_chain::{InsertChain, NullInsertChain};
use crate::playback::PlaybackState;
use crate::progression::{BlendTime, ProgressionConfig, TriggerPoint};

/// Depth of the riff-enqueue SPSC ring.
const RIFF_QUEUE_CAPACITY: usize = 16;
/// Depth of the command SPSC ring. Generously sized: overflow is a
/// programming error, not a silent drop.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// A point-in-time summary of the mixer's audible state, published once
/// per callback for the Exchange snapshot helper to consume on the main
/// thread. Value-typed and cheap to clone.
#[derive(Clone, Debug)]
pub struct MixerStateSnapshot {
    pub current_riff: Option<SharedRiff>,
    pub next_riff: Option<SharedRiff>,
    pub bar_segment_active: u32,
    pub bar_segment_count: u32,
    pub riff_percentage: f32,
    pub riff_transition: f32,
    pub stem_gain: [f32; STEM_SLOTS],
    pub stem_pulse: [f32; STEM_SLOTS],
    pub stem_energy: [f32; STEM_SLOTS],
    pub consensus_beat: f32,
}

impl Default for MixerStateSnapshot {
    fn default() -> Self {
        Self {
            current_riff: None,
            next_riff: None,
            bar_segment_active: 0,
            bar_segment_count: 0,
            riff_percentage: 0.0,
            riff_transition: 0.0,
            stem_gain: [0.0; STEM_SLOTS],
            stem_pulse: [0.0; STEM_SLOTS],
            stem_energy: [0.0; STEM_SLOTS],
            consensus_beat: 0.0,
        }
    }
}

/// Handle used by non-audio threads to control a running [`MixEngine`].
pub struct MixEngineHandle {
    riff_tx: rtrb::Producer<SharedRiff>,
    command_tx: rtrb::Producer<MixCommand>,
    next_op_id: Arc<AtomicU64>,
    observed_op_id: Arc<AtomicU64>,
    events: EventReceiver,
    state: Arc<parking_lot::Mutex<MixerStateSnapshot>>,
}

impl MixEngineHandle {
    /// Append a riff to the play-next queue. Non-blocking.
    pub fn enqueue_riff(&mut self, riff: SharedRiff) -> Result<()> {
        self.riff_tx
            .push(riff)
            .map_err(|_| MixerError::RiffQueueFull)
    }

    fn submit(&mut self, kind: MixCommandKind) -> Result<OperationId> {
        let id = OperationId::new(self.next_op_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.command_tx
            .push(MixCommand { id, kind })
            .map_err(|_| MixerError::CommandQueueFull)?;
        Ok(id)
    }

    /// Schedule a new playback permutation.
    pub fn enqueue_permutation(&mut self, permutation: Permutation) -> Result<OperationId> {
        self.submit(MixCommandKind::SetPermutation(permutation))
    }

    /// Install a new pre-mix insert chain.
    pub fn install_insert_chain(&mut self, chain: Box<dyn InsertChain>) -> Result<OperationId> {
        self.submit(MixCommandKind::InstallInsertChain(chain))
    }

    /// Remove the installed insert chain.
    pub fn clear_insert_chain(&mut self) -> Result<OperationId> {
        self.submit(MixCommandKind::ClearInsertChain)
    }

    /// Flip the master mute flag.
    pub fn toggle_master_mute(&mut self) -> Result<OperationId> {
        self.submit(MixCommandKind::ToggleMasterMute)
    }

    /// Begin a disk-recording session at the next riff-start boundary.
    pub fn begin_recording(&mut self, request: RecordingRequest) -> Result<OperationId> {
        self.submit(MixCommandKind::BeginRecording(request))
    }

    /// Stop any active disk-recording session.
    pub fn stop_recording(&mut self) -> Result<OperationId> {
        self.submit(MixCommandKind::StopRecording)
    }

    /// Replace the transition-scheduling configuration.
    pub fn update_progression_configuration(&mut self, cfg: ProgressionConfig) -> Result<OperationId> {
        self.submit(MixCommandKind::UpdateProgression(cfg))
    }

    /// Spin, yielding, until the audio thread has observed (and, for
    /// permutation/recording changes, applied) the given operation.
    pub fn block_until(&self, id: OperationId) {
        while self.observed_op_id.load(Ordering::Acquire) < id.value() {
            std::thread::yield_now();
        }
    }

    /// Access the event bus receiver.
    pub fn events(&self) -> &EventReceiver {
        &self.events
    }

    /// Read the most recently published audible-state snapshot.
    pub fn snapshot(&self) -> MixerStateSnapshot {
        self.state.lock().clone()
    }
}

/// The audio-thread-owned mix engine. Call [`MixEngine::process`] once per
/// device callback.
pub struct MixEngine {
    riff_rx: rtrb::Consumer<SharedRiff>,
    command_rx: rtrb::Consumer<MixCommand>,
    observed_op_id: Arc<AtomicU64>,
    events: EventSender,
    state: Arc<parking_lot::Mutex<MixerStateSnapshot>>,

    sample_rate: u32,
    global_sample: u64,

    current: Option<SharedRiff>,
    next: Option<SharedRiff>,
    transition_t: f32,

    queued: VecDeque<SharedRiff>,

    permutation: Permutation,
    pending_permutation: Option<(OperationId, Permutation)>,
    insert_chain: Box<dyn InsertChain>,
    progression: ProgressionConfig,
    master_muted: bool,

    recorder: DiskRecorder,
    pending_recording: Option<(OperationId, RecordingRequest)>,
    loop_count: u32,
    loop_riff_id: Option<RiffId>,

    playback: PlaybackState,

    premix_left: Vec<f32>,
    premix_right: Vec<f32>,
    stem_taps: [Vec<f32>; STEM_SLOTS],
    max_block_frames: usize,
}

/// Construct a connected engine/handle pair. `max_block_frames` bounds the
/// largest callback this engine will ever be asked to render; all scratch
/// buffers are preallocated to that size.
pub fn build(sample_rate: u32, max_block_frames: usize) -> (MixEngineHandle, MixEngine) {
    let (riff_tx, riff_rx) = rtrb::RingBuffer::new(RIFF_QUEUE_CAPACITY);
    let (command_tx, command_rx) = rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY);
    let (event_tx, event_rx) = event::event_bus();
    let next_op_id = Arc::new(AtomicU64::new(0));
    let observed_op_id = Arc::new(AtomicU64::new(0));
    let state = Arc::new(parking_lot::Mutex::new(MixerStateSnapshot::default()));

    let handle = MixEngineHandle {
        riff_tx,
        command_tx,
        next_op_id,
        observed_op_id: observed_op_id.clone(),
        events: event_rx,
        state: state.clone(),
    };

    let engine = MixEngine {
        riff_rx,
        command_rx,
        observed_op_id,
        events: event_tx,
        state,
        sample_rate,
        global_sample: 0,
        current: None,
        next: None,
        transition_t: 0.0,
        queued: VecDeque::with_capacity(RIFF_QUEUE_CAPACITY),
        permutation: Permutation::new(),
        pending_permutation: None,
        insert_chain: Box::new(NullInsertChain),
        progression: ProgressionConfig::default(),
        master_muted: false,
        recorder: DiskRecorder::new(max_block_frames),
        pending_recording: None,
        loop_count: 0,
        loop_riff_id: None,
        playback: PlaybackState::new(),
        premix_left: vec![0.0; max_block_frames],
        premix_right: vec![0.0; max_block_frames],
        stem_taps: std::array::from_fn(|_| vec![0.0; max_block_frames]),
        max_block_frames,
    };

    (handle, engine)
}

impl MixEngine {
    /// Render one device callback's worth of interleaved stereo audio
    /// into `out`. `out.len()` must be even and at most
    /// `2 * max_block_frames`.
    pub fn process(&mut self, out: &mut [f32]) {
        debug_assert_eq!(out.len() % 2, 0, "interleaved stereo buffer must have even length");
        let frames = out.len() / 2;
        debug_assert!(
            frames <= self.max_block_frames,
            "callback exceeded the preallocated scratch size"
        );

        self.drain_commands();
        self.drain_riff_queue();

        if self.progression.trigger_point == TriggerPoint::Arbitrary {
            self.maybe_promote();
        }

        let base_sample = self.global_sample;
        self.global_sample = self.global_sample.wrapping_add(frames as u64);

        let mut block_beats = [false; STEM_SLOTS];
        let mut last_energy = [0.0f32; STEM_SLOTS];
        let mut last_gain = [0.0f32; STEM_SLOTS];
        let mut last_bar = 0u32;
        let mut last_bar_count = 0u32;
        let mut last_percentage = 0.0f32;

        for i in 0..frames {
            let sample_global = base_sample + i as u64;

            self.advance_transition_one_sample();

            let Some(current) = self.current.clone() else {
                self.premix_left[i] = 0.0;
                self.premix_right[i] = 0.0;
                for tap in &mut self.stem_taps {
                    tap[i] = 0.0;
                }
                continue;
            };

            let length = current.length_in_samples();
            let riff_sample = if length == 0 { 0 } else { sample_global % length };
            let bar_len = current.length_in_samples_per_bar();
            let bar_index = if bar_len == 0 { 0 } else { (riff_sample / bar_len) as u32 };
            let is_bar_start = bar_len != 0 && riff_sample % bar_len == 0;
            let is_riff_start = length != 0 && riff_sample == 0;

            let (cl, cr, cbeats, cenergy, cgain) =
                mix_stems(&current, riff_sample, &self.permutation);

            let (out_l, out_r) = if let Some(next_riff) = self.next.clone() {
                let next_len = next_riff.length_in_samples();
                let next_sample = if next_len == 0 { 0 } else { sample_global % next_len };
                let (nl, nr, nbeats, nenergy, ngain) =
                    mix_stems(&next_riff, next_sample, &self.permutation);
                let t = self.transition_t;
                for slot in 0..STEM_SLOTS {
                    block_beats[slot] |= cbeats[slot] || nbeats[slot];
                    last_energy[slot] = riffwork_core::math::lerp(cenergy[slot], nenergy[slot], t);
                    last_gain[slot] = riffwork_core::math::lerp(cgain[slot], ngain[slot], t);
                }
                (
                    riffwork_core::math::lerp(cl, nl, t),
                    riffwork_core::math::lerp(cr, nr, t),
                )
            } else {
                for slot in 0..STEM_SLOTS {
                    block_beats[slot] |= cbeats[slot];
                    last_energy[slot] = cenergy[slot];
                    last_gain[slot] = cgain[slot];
                }
                (cl, cr)
            };

            self.premix_left[i] = out_l;
            self.premix_right[i] = out_r;

            fill_stem_taps(&current, riff_sample, &self.permutation, i, &mut self.stem_taps);

            last_bar = bar_index;
            last_bar_count = current.bar_count();
            last_percentage = if length == 0 {
                0.0
            } else {
                riff_sample as f32 / length as f32
            };

            if is_bar_start {
                self.on_bar_start(bar_index);
            }
            if is_riff_start {
                self.on_riff_start(&current);
            }
        }

        self.playback.observe(block_beats, frames as u32, self.sample_rate);

        self.insert_chain.process(
            &mut self.premix_left[..frames],
            &mut self.premix_right[..frames],
        );

        for i in 0..frames {
            let (l, r) = if self.master_muted {
                (0.0, 0.0)
            } else {
                (self.premix_left[i], self.premix_right[i])
            };
            out[i * 2] = l;
            out[i * 2 + 1] = r;
        }

        if !self.master_muted {
            self.recorder.push_stereo(&interleave_scratch(&self.premix_left[..frames], &self.premix_right[..frames]));
        }
        let tap_refs: [&[f32]; STEM_SLOTS] = std::array::from_fn(|slot| &self.stem_taps[slot][..frames]);
        self.recorder.push_multitrack(&tap_refs, self.loop_count > 0);

        self.publish_state(last_bar, last_bar_count, last_percentage, last_gain, last_energy);
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.command_rx.pop() {
            match cmd.kind {
                MixCommandKind::InstallInsertChain(chain) => {
                    self.insert_chain = chain;
                    self.complete(cmd.id);
                }
                MixCommandKind::ClearInsertChain => {
                    self.insert_chain = Box::new(NullInsertChain);
                    self.complete(cmd.id);
                }
                MixCommandKind::ToggleMasterMute => {
                    self.master_muted = !self.master_muted;
                    self.complete(cmd.id);
                }
                MixCommandKind::SetPermutation(permutation) => {
                    if self.progression.trigger_point == TriggerPoint::Arbitrary {
                        self.permutation = permutation;
                        self.complete(cmd.id);
                    } else {
                        self.pending_permutation = Some((cmd.id, permutation));
                    }
                }
                MixCommandKind::BeginRecording(request) => {
                    self.pending_recording = Some((cmd.id, request));
                }
                MixCommandKind::StopRecording => {
                    self.recorder.stop();
                    self.complete(cmd.id);
                }
                MixCommandKind::UpdateProgression(cfg) => {
                    self.progression = cfg;
                    self.complete(cmd.id);
                }
            }
        }
    }

    fn drain_riff_queue(&mut self) {
        while let Ok(riff) = self.riff_rx.pop() {
            if self.queued.len() == self.queued.capacity() {
                self.queued.pop_front();
            }
            self.queued.push_back(riff);
        }
    }

    fn complete(&mut self, id: OperationId) {
        self.observed_op_id.store(id.value(), Ordering::Release);
        event::post(&self.events, MixerEvent::OperationComplete { id });
    }

    fn advance_transition_one_sample(&mut self) {
        let Some(next) = self.next.clone() else { return };
        let Some(current) = self.current.as_ref() else { return };

        let multiplier = self.progression.blend_time.multiplier().unwrap_or(1.0);
        let bar_secs = current.length_in_sec_per_bar();
        if bar_secs <= 0.0 || self.sample_rate == 0 {
            // Degenerate timing (silent shell) — treat as an immediate swap
            // rather than dividing by zero.
            self.swap_in_next();
            return;
        }
        let transition_rate = 1.0 / (bar_secs * multiplier);
        self.transition_t += transition_rate / self.sample_rate as f32;

        if self.transition_t >= 1.0 {
            self.transition_t = 0.0;
            self.current = Some(next);
            self.next = None;
            event::post(
                &self.events,
                MixerEvent::MixerRiffChange {
                    riff: self.current.clone(),
                },
            );
        }
    }

    fn swap_in_next(&mut self) {
        if let Some(next) = self.next.take() {
            self.current = Some(next);
            self.transition_t = 0.0;
            event::post(
                &self.events,
                MixerEvent::MixerRiffChange {
                    riff: self.current.clone(),
                },
            );
        }
    }

    /// Try to promote a queued riff. Only called when no transition is
    /// already in flight.
    fn maybe_promote(&mut self) {
        if self.next.is_some() || self.queued.is_empty() {
            return;
        }

        let riff = if self.progression.greedy_mode {
            let newest = self.queued.pop_back();
            self.queued.clear();
            newest
        } else {
            self.queued.pop_front()
        };

        let Some(riff) = riff else { return };
        if riff.is_silent_shell() {
            // Never promoted to current or next;
            // simply dropped.
            return;
        }

        if self.current.is_none() {
            self.current = Some(riff);
            self.loop_riff_id = None;
            self.loop_count = 0;
            event::post(
                &self.events,
                MixerEvent::MixerRiffChange {
                    riff: self.current.clone(),
                },
            );
            return;
        }

        if self.progression.blend_time.is_hard_cut() {
            self.current = Some(riff);
            self.next = None;
            self.transition_t = 0.0;
            event::post(
                &self.events,
                MixerEvent::MixerRiffChange {
                    riff: self.current.clone(),
                },
            );
        } else {
            self.next = Some(riff);
            self.transition_t = 0.0;
        }
    }

    fn on_bar_start(&mut self, bar_index: u32) {
        if let Some((id, permutation)) = self.pending_permutation.take() {
            self.permutation = permutation;
            self.complete(id);
        }

        let should_check = match self.progression.trigger_point {
            TriggerPoint::Arbitrary => false, // handled once per callback, not per bar
            TriggerPoint::NextRiffStart => bar_index == 0,
            TriggerPoint::AnyBarStart => true,
            TriggerPoint::AnyEvenBarStart => bar_index % 2 == 0,
        };
        if should_check {
            self.maybe_promote();
        }
    }

    fn on_riff_start(&mut self, current: &SharedRiff) {
        let id = *current.riff_id();
        if self.loop_riff_id == Some(id) {
            self.loop_count = self.loop_count.saturating_add(1);
        } else {
            self.loop_riff_id = Some(id);
            self.loop_count = 0;
        }

        if let Some((id, request)) = self.pending_recording.take() {
            match self.recorder.begin(&request, self.sample_rate) {
                Ok(()) => self.complete(id),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to begin disk recording");
                    self.complete(id);
                }
            }
        }
    }

    fn publish_state(
        &mut self,
        bar_segment_active: u32,
        bar_segment_count: u32,
        riff_percentage: f32,
        stem_gain: [f32; STEM_SLOTS],
        stem_energy: [f32; STEM_SLOTS],
    ) {
        let snapshot = MixerStateSnapshot {
            current_riff: self.current.clone(),
            next_riff: self.next.clone(),
            bar_segment_active,
            bar_segment_count,
            riff_percentage,
            riff_transition: self.transition_t,
            stem_gain,
            stem_pulse: self.playback.stem_pulse(),
            stem_energy,
            consensus_beat: self.playback.consensus_beat(),
        };
        *self.state.lock() = snapshot;
    }
}

fn mix_stems(
    riff: &Riff,
    riff_sample: u64,
    permutation: &Permutation,
) -> (f32, f32, [bool; STEM_SLOTS], [f32; STEM_SLOTS], [f32; STEM_SLOTS]) {
    let mut left = 0.0f32;
    let mut right = 0.0f32;
    let mut beats = [false; STEM_SLOTS];
    let mut energy = [0.0f32; STEM_SLOTS];
    let mut gains = [0.0f32; STEM_SLOTS];

    for slot in 0..STEM_SLOTS {
        let Some(index) = riff.stem_sample_index(slot, riff_sample) else {
            continue;
        };
        let Some(stem) = riff.stem(slot) else { continue };
        let gain = riff.stem_gain(slot) * permutation.effective_gain(slot);
        let (sl, sr) = stem.sample(index);
        left += sl * gain;
        right += sr * gain;
        beats[slot] = stem.beat_at(index);
        energy[slot] = stem.energy_at(index);
        gains[slot] = gain;
    }

    (left, right, beats, energy, gains)
}

/// Fill one column (sample `i`) of the per-stem multitrack taps from the
/// current riff only.
fn fill_stem_taps(
    riff: &Riff,
    riff_sample: u64,
    permutation: &Permutation,
    i: usize,
    taps: &mut [Vec<f32>; STEM_SLOTS],
) {
    for slot in 0..STEM_SLOTS {
        let Some(index) = riff.stem_sample_index(slot, riff_sample) else {
            taps[slot][i] = 0.0;
            continue;
        };
        let Some(stem) = riff.stem(slot) else {
            taps[slot][i] = 0.0;
            continue;
        };
        let gain = riff.stem_gain(slot) * permutation.effective_gain(slot);
        let (sl, sr) = stem.sample(index);
        taps[slot][i] = (sl + sr) * 0.5 * gain;
    }
}

fn interleave_scratch(left: &[f32], right: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(left.len() * 2);
    for (l, r) in left.iter().zip(right) {
        out.push(*l);
        out.push(*r);
    }
    out
}
