//! Errors surfaced by the mix engine's non-audio-thread API.
//!
//! The audio thread itself never signals errors upward: a stem that fails to decode or a queue that runs
//! dry both degrade to silence. These variants only cover setup and
//! control-plane failures that happen off the audio thread.

#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error("riff queue is full")]
    RiffQueueFull,

    #[error("command queue is full")]
    CommandQueueFull,
}

pub type Result<T> = std::result::Result<T, MixerError>;
