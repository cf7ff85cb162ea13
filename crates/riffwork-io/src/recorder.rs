//! Disk recorder: optional per-callback stereo or 8-track FLAC sink.
//!
//! The mixer calls [`DiskRecorder::push_stereo`] or
//! [`DiskRecorder::push_multitrack`] once per audio callback. Those calls
//! must never allocate or block: each recorder owns a small pool of
//! pre-allocated buffers recycled through a bounded channel, so "filling a
//! buffer" is just a slice copy and "handing it off" is a channel send of
//! an already-owned value. A background thread drains the full-buffer
//! channel, runs it through a [flac-bound](https://crates.io/crates/flac-bound)
//! encoder, and writes the result to disk — entirely off the audio thread.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};
use flac_bound::{FlacEncoder, WriteWrapper};

use crate::{Error, Result};

/// Number of pooled blocks kept in flight per channel. Generous relative
/// to typical callback cadence so the audio thread practically never
/// finds the pool empty.
const POOL_DEPTH: usize = 16;

/// One pre-allocated block of interleaved samples, sized to the largest
/// callback the recorder was built for.
type Block = Vec<f32>;

struct ChannelRecorder {
    free_rx: Receiver<Block>,
    full_tx: Sender<Block>,
    worker: Option<JoinHandle<()>>,
    block_capacity: usize,
    sample_rate: u32,
    channels: u32,
    overruns: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl ChannelRecorder {
    fn spawn(path: PathBuf, sample_rate: u32, channels: u32, max_block_frames: usize) -> Result<Self> {
        let block_capacity = max_block_frames * channels as usize;
        let (free_tx, free_rx) = bounded::<Block>(POOL_DEPTH);
        let (full_tx, full_rx) = bounded::<Block>(POOL_DEPTH);
        for _ in 0..POOL_DEPTH {
            free_tx
                .send(vec![0.0; block_capacity])
                .expect("pool channel just created, cannot be full");
        }

        let overruns = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let worker = spawn_flac_writer(path, sample_rate, channels, full_rx, free_tx)?;

        Ok(Self {
            free_rx,
            full_tx,
            worker: Some(worker),
            block_capacity,
            sample_rate,
            channels,
            overruns,
        })
    }

    /// Copy `frame_count` interleaved samples into a pooled block and hand
    /// it to the writer thread. Never allocates and never blocks: if the
    /// pool is exhausted (writer thread has fallen behind), the block is
    /// dropped and an overrun is counted rather than stalling the audio
    /// thread.
    fn push(&self, interleaved: &[f32]) {
        debug_assert!(interleaved.len() <= self.block_capacity);
        let Ok(mut block) = self.free_rx.try_recv() else {
            self.overruns.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return;
        };
        block.clear();
        block.extend_from_slice(interleaved);
        if self.full_tx.try_send(block).is_err() {
            self.overruns.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    fn close(mut self) {
        drop(self.full_tx);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn spawn_flac_writer(
    path: PathBuf,
    sample_rate: u32,
    channels: u32,
    full_rx: Receiver<Block>,
    free_tx: Sender<Block>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("riffwork-recorder".into())
        .spawn(move || {
            if let Err(err) = run_flac_writer(&path, sample_rate, channels, &full_rx, &free_tx) {
                tracing::warn!(path = %path.display(), error = %err, "disk recorder write failed");
            }
        })
        .map_err(|e| Error::Stream(e.to_string()))?;
    Ok(handle)
}

fn run_flac_writer(
    path: &Path,
    sample_rate: u32,
    channels: u32,
    full_rx: &Receiver<Block>,
    free_tx: &Sender<Block>,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    let mut wrapper = WriteWrapper(&mut writer);

    let mut encoder = FlacEncoder::new()
        .ok_or_else(|| Error::Stream("FLAC encoder init failed".into()))?
        .channels(channels)
        .sample_rate(sample_rate)
        .bits_per_sample(24)
        .compression_level(5)
        .init_write(&mut wrapper)
        .map_err(|_| Error::Stream("FLAC init_write failed".into()))?;

    const MAX_VAL: f32 = (1i64 << 23) as f32;
    let mut scratch: Vec<i32> = Vec::new();

    while let Ok(block) = full_rx.recv() {
        if block.is_empty() {
            let _ = free_tx.try_send(block);
            continue;
        }
        scratch.clear();
        scratch.extend(block.iter().map(|s| (s.clamp(-1.0, 1.0) * MAX_VAL) as i32));
        let frames = (scratch.len() / channels as usize) as u32;
        if encoder.process_interleaved(&scratch, frames).is_err() {
            tracing::warn!("FLAC process_interleaved failed, dropping block");
        }
        let _ = free_tx.try_send(block);
    }

    encoder
        .finish()
        .map_err(|_| Error::Stream("FLAC finish failed".into()))?;
    Ok(())
}

/// The stem-slot count taps are sized for; kept in sync with
/// `riffwork_core::STEM_SLOTS` without introducing a cyclic dependency
/// between `riffwork-io` and `riffwork-core`.
pub const RECORDER_TRACKS: usize = 8;

/// Which on-disk layout a recording session is producing.
#[derive(Debug, Clone)]
pub enum RecordingRequest {
    /// A single stereo file: `<timestamp>_finalmix.flac`.
    Stereo { path: PathBuf },
    /// Eight mono files: `<timestamp>beam_channel<0..7>.flac`.
    Multitrack { dir: PathBuf, timestamp: String },
}

enum Active {
    Stereo(ChannelRecorder),
    Multitrack(Box<[ChannelRecorder; RECORDER_TRACKS]>),
}

/// An optional, lazily-opened recording sink. Holds no state while
/// inactive; [`DiskRecorder::begin`] opens the writer thread(s),
/// [`DiskRecorder::stop`] closes them.
pub struct DiskRecorder {
    active: Option<Active>,
    max_block_frames: usize,
}

impl DiskRecorder {
    /// Construct an inactive recorder sized for callbacks up to
    /// `max_block_frames` samples per channel.
    pub fn new(max_block_frames: usize) -> Self {
        Self {
            active: None,
            max_block_frames,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Open the writer thread(s) for `request`. Replaces any existing
    /// recording (the caller is expected to have called [`Self::stop`]
    /// first if a graceful close of the prior recording was wanted).
    pub fn begin(&mut self, request: &RecordingRequest, sample_rate: u32) -> Result<()> {
        self.active = Some(match request {
            RecordingRequest::Stereo { path } => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Active::Stereo(ChannelRecorder::spawn(path.clone(), sample_rate, 2, self.max_block_frames)?)
            }
            RecordingRequest::Multitrack { dir, timestamp } => {
                std::fs::create_dir_all(dir)?;
                let mut tracks = Vec::with_capacity(RECORDER_TRACKS);
                for channel in 0..RECORDER_TRACKS {
                    let path = dir.join(format!("{timestamp}beam_channel{channel}.flac"));
                    tracks.push(ChannelRecorder::spawn(path, sample_rate, 1, self.max_block_frames)?);
                }
                let tracks: [ChannelRecorder; RECORDER_TRACKS] = tracks
                    .try_into()
                    .unwrap_or_else(|_| unreachable!("exactly RECORDER_TRACKS were pushed"));
                Active::Multitrack(Box::new(tracks))
            }
        });
        Ok(())
    }

    /// Push one callback's worth of interleaved stereo samples. No-op if no stereo recording is active.
    pub fn push_stereo(&self, interleaved: &[f32]) {
        if let Some(Active::Stereo(rec)) = &self.active {
            rec.push(interleaved);
        }
    }

    /// Push one callback's worth of per-track mono samples. `tracks[i]` is mono samples for stem slot `i`.
    /// `paused` skips the write entirely, for a block whose current bar is
    /// a verbatim repeat of a prior loop iteration (RepCom).
    pub fn push_multitrack(&self, tracks: &[&[f32]; RECORDER_TRACKS], paused: bool) {
        if paused {
            return;
        }
        if let Some(Active::Multitrack(recs)) = &self.active {
            for (rec, samples) in recs.iter().zip(tracks.iter()) {
                rec.push(samples);
            }
        }
    }

    /// Close the active recording, if any, flushing and joining its
    /// writer thread(s) off the audio thread (the caller is expected to
    /// invoke this from a non-realtime context; dropping a still-open
    /// `JoinHandle` on the audio thread would block it).
    pub fn stop(&mut self) {
        match self.active.take() {
            Some(Active::Stereo(rec)) => rec.close(),
            Some(Active::Multitrack(recs)) => {
                for rec in Vec::from(recs as Box<[ChannelRecorder; RECORDER_TRACKS]>) {
                    rec.close();
                }
            }
            None => {}
        }
    }
}

impl Drop for DiskRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_recorder_ignores_pushes() {
        let recorder = DiskRecorder::new(512);
        assert!(!recorder.is_active());
        recorder.push_stereo(&[0.0; 16]);
    }

    #[test]
    fn begin_stereo_then_stop_produces_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.flac");
        let mut recorder = DiskRecorder::new(512);
        recorder.begin(&RecordingRequest::Stereo { path: path.clone() }, 44100).unwrap();
        assert!(recorder.is_active());

        for _ in 0..4 {
            recorder.push_stereo(&[0.1, -0.1, 0.2, -0.2]);
        }
        recorder.stop();
        assert!(!recorder.is_active());
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn begin_multitrack_writes_eight_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DiskRecorder::new(512);
        recorder
            .begin(
                &RecordingRequest::Multitrack {
                    dir: dir.path().to_path_buf(),
                    timestamp: "20260101T000000Z".into(),
                },
                44100,
            )
            .unwrap();

        let tracks: [&[f32]; RECORDER_TRACKS] = std::array::from_fn(|_| &[0.1f32, 0.2, 0.3][..]);
        recorder.push_multitrack(&tracks, false);
        recorder.stop();

        for channel in 0..RECORDER_TRACKS {
            let path = dir.path().join(format!("20260101T000000Zbeam_channel{channel}.flac"));
            assert!(path.exists(), "missing {}", path.display());
        }
    }

    #[test]
    fn paused_multitrack_push_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DiskRecorder::new(512);
        recorder
            .begin(
                &RecordingRequest::Multitrack {
                    dir: dir.path().to_path_buf(),
                    timestamp: "t".into(),
                },
                44100,
            )
            .unwrap();
        let tracks: [&[f32]; RECORDER_TRACKS] = std::array::from_fn(|_| &[0.1f32][..]);
        // Paused pushes must not panic and must not touch the writer threads.
        recorder.push_multitrack(&tracks, true);
        recorder.stop();
    }
}
