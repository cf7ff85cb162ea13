//! The in-process event bus: typed, one-shot notifications
//! from the audio thread (and the pipeline/cache sweep) to main-thread
//! dispatch.
//!
//! Carried over `crossbeam_channel` rather than the `rtrb` rings used for
//! commands and riff enqueueing: events are multi-producer (the audio
//! thread posts `RiffChange`/`OperationComplete`, but a cache sweep or the
//! pipeline may also want to post a toast), which `rtrb`'s SPSC contract
//! cannot express.

use std::time::Duration;

use riffwork_core::{OperationId, Permutation, SharedRiff};

/// Severity of an [`MixerEvent::AddToastNotification`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Warning,
    Error,
}

/// Per-stem energy/pulse snapshot posted once analysis settles for a
/// newly-promoted riff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StemAmalgam {
    pub energy: [f32; riffwork_core::STEM_SLOTS],
    pub pulse: [f32; riffwork_core::STEM_SLOTS],
}

/// Events posted by the mix engine (and, for toasts, any other
/// component) for main-thread dispatch.
#[derive(Clone, Debug)]
pub enum MixerEvent {
    /// The currently-playing riff changed (including to `None`, when the
    /// engine falls silent).
    MixerRiffChange { riff: Option<SharedRiff> },
    /// A previously-submitted operation has been observed and applied by
    /// the audio thread.
    OperationComplete { id: OperationId },
    /// A request to export the given riff with the given permutation
    /// adjustments baked in.
    ExportRiff {
        riff: SharedRiff,
        adjustments: Permutation,
    },
    /// Per-stem energy/pulse data is ready for broadcast/UI consumption.
    StemDataAmalgamGenerated { amalgam: StemAmalgam },
    /// Emergency stop: silence everything immediately.
    PanicStop,
    /// A transient UI notification.
    AddToastNotification {
        kind: ToastKind,
        title: String,
        body: String,
        duration: Duration,
    },
}

/// Depth of the event channel. Generous: events are low-frequency
/// relative to the audio callback, so this is sized for bursts (several
/// toast notifications queued back to back) rather than steady-state
/// throughput.
const EVENT_CHANNEL_DEPTH: usize = 256;

/// Sending half of the event bus.
pub type EventSender = crossbeam_channel::Sender<MixerEvent>;
/// Receiving half of the event bus.
pub type EventReceiver = crossbeam_channel::Receiver<MixerEvent>;

/// Construct a new event bus channel pair.
pub fn event_bus() -> (EventSender, EventReceiver) {
    crossbeam_channel::bounded(EVENT_CHANNEL_DEPTH)
}

/// Post an event without blocking. Used from the audio thread: a full
/// channel drops the event and logs, rather than stalling the callback.
pub fn post(sender: &EventSender, event: MixerEvent) {
    if sender.try_send(event).is_err() {
        tracing::warn!("event bus full, dropping event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_delivers_to_receiver() {
        let (tx, rx) = event_bus();
        post(&tx, MixerEvent::PanicStop);
        assert!(matches!(rx.try_recv().unwrap(), MixerEvent::PanicStop));
    }
}
