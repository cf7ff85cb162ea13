//! Riffwork Core — data model for the Endlesss-style riff mixing engine.
//!
//! This crate provides the foundational, allocation-light types shared by
//! every other `riffwork-*` crate:
//!
//! - [`ids`] — content-addressed identifiers ([`JamId`], [`RiffId`],
//!   [`StemId`], [`StemFingerprint`])
//! - [`stem`] — decoded loop audio ([`Stem`], [`SharedStem`])
//! - [`riff`] — a resolved riff's eight stem slots and timing ([`Riff`],
//!   [`SharedRiff`])
//! - [`permutation`] — per-stem mute/solo/gain ([`Permutation`])
//! - [`exchange`] — the per-tick UI/IPC snapshot ([`ExchangeSnapshot`])
//! - [`math`] — level conversion and interpolation helpers
//!
//! None of these types know about threads, sockets, or audio devices —
//! that's `riffwork-cache`, `riffwork-pipeline`, `riffwork-io` and
//! `riffwork-mixer`, respectively.

pub mod exchange;
pub mod ids;
pub mod math;
pub mod permutation;
pub mod riff;
pub mod stem;

pub use exchange::{DataFlags, ExchangeSnapshot, JAM_NAME_LEN, SCOPE_BUCKETS};
pub use ids::{JamId, RiffId, StemFingerprint, StemId, ID_BYTES};
pub use permutation::{OperationId, Permutation, PermutationQuery};
pub use riff::{Riff, SharedRiff, STEM_SLOTS};
pub use stem::{SharedStem, Stem, BEAT_BITS_PER_WORD};
