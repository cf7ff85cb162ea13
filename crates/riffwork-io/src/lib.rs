//! Audio device I/O and disk recording.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_wav`] and [`write_wav`], used by the fetch
//!   pipeline's disk cache and by tests.
//! - **Device streaming**: [`AudioStream`] plus the [`backend`] module's
//!   [`backend::AudioBackend`] trait, which decouples the mixer's audio
//!   callback from any one platform audio library.
//! - **Disk recording**: [`DiskRecorder`], a FLAC sink for the live stereo
//!   mix and per-stem multitrack taps.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use riffwork_io::{default_device, AudioStream, StreamConfig};
//!
//! let device = default_device()?;
//! let config = StreamConfig::default();
//! let stream = AudioStream::open_output(&device, config, move |out, info| {
//!     // fill `out` from the mix engine
//! })?;
//! ```

pub mod backend;
pub mod cpal_backend;
mod recorder;
mod stream;
mod wav;

pub use recorder::{DiskRecorder, RecordingRequest, RECORDER_TRACKS};
pub use stream::{
    AudioDevice, AudioStream, StreamConfig, default_device, find_device_by_index,
    find_device_fuzzy, list_devices,
};
pub use wav::{
    StereoSamples, WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, read_wav_stereo,
    write_wav, write_wav_stereo,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
