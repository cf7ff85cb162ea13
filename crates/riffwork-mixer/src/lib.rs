//! Riffwork Mixer — the audio-thread-owned Riff Mix Engine.
//!
//! [`build`] wires up a connected [`MixEngineHandle`] (used from any
//! non-audio thread to enqueue riffs, permutations, recording requests and
//! progression changes) and a [`MixEngine`] (owned by the audio callback,
//! rendering one device buffer per call to [`MixEngine::process`]).
//! Everything crossing from handle to engine travels over preallocated
//! `rtrb` rings; the engine never locks a mutex shared with another thread
//! and never allocates after [`build`] returns.
//!
//! [`ExchangeBuilder`] runs on the main/UI thread, folding a
//! [`MixerStateSnapshot`] plus the block the engine just rendered into an
//! `ExchangeSnapshot` once per tick.

mod command;
mod engine;
mod error;
mod event;
mod exchange;
mod insert_chain;
mod playback;
mod progression;

pub use engine::{build, MixEngine, MixEngineHandle, MixerStateSnapshot};
pub use error::{MixerError, Result};
pub use event::{event_bus, EventReceiver, EventSender, MixerEvent, StemAmalgam, ToastKind};
pub use exchange::ExchangeBuilder;
pub use insert_chain::{InsertChain, NullInsertChain};
pub use progression::{BlendTime, ProgressionConfig, TriggerPoint};
