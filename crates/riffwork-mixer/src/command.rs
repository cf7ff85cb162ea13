//! Commands pushed from non-audio threads onto the mix command queue.
//! Every mutation of mixer state other than riff enqueueing — which has
//! its own dedicated queue — goes through here as a tagged variant,
//! never via a lock shared with the audio thread.

use riffwork_core::Permutation;
use riffwork_io::RecordingRequest;

use crate::insert_chain::InsertChain;
use crate::progression::ProgressionConfig;

/// What a [`MixCommand`] asks the audio thread to do.
pub enum MixCommandKind {
    /// Install a new pre-mix insert chain, replacing any previous one.
    InstallInsertChain(Box<dyn InsertChain>),
    /// Remove the installed insert chain, reverting to pass-through.
    ClearInsertChain,
    /// Flip the engine's master mute flag (silences the device output and
    /// disk-recorder stereo tap; per-stem taps are unaffected).
    ToggleMasterMute,
    /// Schedule a new playback permutation, adopted at the next trigger
    /// point (or immediately, in `Arbitrary` mode).
    SetPermutation(Permutation),
    /// Open a recording session at the next riff-start boundary.
    BeginRecording(RecordingRequest),
    /// Close any active recording session.
    StopRecording,
    /// Replace the live transition-scheduling configuration.
    UpdateProgression(ProgressionConfig),
}

/// A queued command plus the id the submitter uses to later confirm the
/// audio thread has applied it.
pub struct MixCommand {
    pub id: riffwork_core::OperationId,
    pub kind: MixCommandKind,
}
