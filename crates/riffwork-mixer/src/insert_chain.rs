//! The single serial pre-mix insert chain.
//!
//! Grounded on the `InsertProcessor` shape from a multi-slot insert chain
//! in the wider DSP corpus, trimmed to the single slot this engine needs:
//! the mixer owns no DSP of its own, so whatever is installed here is the
//! only place the stereo pre-mix gets shaped before reaching the device.

/// A single stage of stereo processing applied to the mixed-down output
/// once per callback, in place.
///
/// Implementations must be real-time safe: no allocation, no blocking, no
/// I/O inside [`InsertChain::process`].
pub trait InsertChain: Send {
    /// Process one callback's worth of stereo audio in place. `left` and
    /// `right` are always the same length (the callback's frame count).
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);
}

/// The default chain installed when no insert has been supplied: passes
/// audio through unchanged.
pub struct NullInsertChain;

impl InsertChain for NullInsertChain {
    fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {}
}
