//! The Riff Fetch Pipeline: a single background worker that turns riff
//! requests into fully-loaded [`Riff`]s.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError, unbounded};
use riffwork_cache::StemCache;
use riffwork_core::{Permutation, Riff, RiffId, StemId};

use crate::decode::decode_stem;
use crate::disk_cache::DiskCache;
use crate::fetch::StemFetcher;
use crate::resolver::{RiffIdent, RiffResolver};

/// Outcome of a resolved riff request, handed to the completion callback
/// in submission order.
pub struct RiffResolved {
    pub riff_id: RiffId,
    /// `None` when the resolver could not find the riff at all; the
    /// identifier and permutation are still published so a caller can tell
    /// which request this answers.
    pub riff: Option<Riff>,
    pub permutation: Option<Permutation>,
}

enum Request {
    Resolve {
        riff_id: RiffId,
        permutation: Option<Permutation>,
    },
    Clear,
}

/// Accepts riff requests from any thread, resolves and decodes them on a
/// single background worker, and publishes results through a completion
/// callback in submission order.
pub struct RiffPipeline {
    sender: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
    last_enqueued: std::sync::Mutex<Option<RiffId>>,
}

impl RiffPipeline {
    /// Spawn the worker thread. `device_sample_rate` is the rate stems are
    /// decoded/resampled to; `on_complete` is invoked once per resolved
    /// request, in submission order, from the worker thread.
    pub fn spawn(
        resolver: Arc<dyn RiffResolver>,
        cache: Arc<StemCache>,
        disk_cache: DiskCache,
        device_sample_rate: u32,
        on_complete: impl FnMut(RiffResolved) + Send + 'static,
        on_clear_complete: impl FnMut() + Send + 'static,
    ) -> Self {
        let (sender, receiver): (Sender<Request>, Receiver<Request>) = unbounded();
        let fetcher = StemFetcher::new(disk_cache);

        let worker = std::thread::Builder::new()
            .name("riffwork-pipeline".into())
            .spawn(move || {
                worker_loop(
                    &receiver,
                    resolver.as_ref(),
                    &cache,
                    &fetcher,
                    device_sample_rate,
                    on_complete,
                    on_clear_complete,
                );
            })
            .expect("failed to spawn pipeline worker thread");

        Self {
            sender: Some(sender),
            worker: Some(worker),
            last_enqueued: std::sync::Mutex::new(None),
        }
    }

    /// Enqueue a riff for resolution. Non-blocking; duplicate consecutive
    /// requests for the same riff id coalesce.
    pub fn request_riff(&self, riff_id: RiffId, permutation: Option<Permutation>) {
        let mut last = self.last_enqueued.lock().unwrap();
        if *last == Some(riff_id) {
            tracing::trace!(%riff_id, "coalesced duplicate consecutive riff request");
            return;
        }
        *last = Some(riff_id);
        drop(last);

        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(TrySendError::Disconnected(_)) =
            sender.try_send(Request::Resolve { riff_id, permutation })
        {
            tracing::warn!("pipeline worker has shut down, dropping riff request");
        }
    }

    /// Abort in-flight work, drain the queue, and invoke the clear-complete
    /// callback once the worker reaches a safe point.
    pub fn request_clear(&self) {
        *self.last_enqueued.lock().unwrap() = None;
        if let Some(sender) = &self.sender {
            let _ = sender.send(Request::Clear);
        }
    }
}

impl Drop for RiffPipeline {
    fn drop(&mut self) {
        // Dropping the sender closes the channel, which unblocks the
        // worker's `recv()` so it can exit cleanly.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    receiver: &Receiver<Request>,
    resolver: &dyn RiffResolver,
    cache: &Arc<StemCache>,
    fetcher: &StemFetcher,
    device_sample_rate: u32,
    mut on_complete: impl FnMut(RiffResolved) + Send + 'static,
    mut on_clear_complete: impl FnMut() + Send + 'static,
) {
    // The worker processes one request to completion before dequeuing the
    // next, so a `Clear` always takes effect before any subsequent
    // `Resolve` begins — no stem decode ever starts after a pending clear.
    while let Ok(request) = receiver.recv() {
        match request {
            Request::Clear => {
                // Drain anything else already queued; none of it should resolve now.
                while receiver.try_recv().is_ok() {}
                on_clear_complete();
            }
            Request::Resolve { riff_id, permutation } => {
                let resolved = resolve_one(resolver, cache, fetcher, device_sample_rate, riff_id);
                on_complete(RiffResolved {
                    riff_id,
                    riff: resolved,
                    permutation,
                });
            }
        }
    }
}

fn resolve_one(
    resolver: &dyn RiffResolver,
    cache: &Arc<StemCache>,
    fetcher: &StemFetcher,
    device_sample_rate: u32,
    riff_id: RiffId,
) -> Option<Riff> {
    let metadata = resolver.resolve(&RiffIdent::Riff(riff_id))?;

    let scale = if metadata.native_sample_rate == 0 {
        1.0
    } else {
        f64::from(device_sample_rate) / f64::from(metadata.native_sample_rate)
    };
    let length_in_samples = (metadata.length_in_native_samples as f64 * scale).round() as u64;
    let length_in_samples = round_to_bar_multiple(length_in_samples, metadata.bar_count);

    let mut riff = Riff::new(
        riff_id,
        metadata.bpm,
        metadata.quarter_beats,
        metadata.bar_count.max(1),
        length_in_samples,
        device_sample_rate,
        metadata.cid_hash,
    );

    for (slot, descriptor) in metadata.stems.into_iter().enumerate() {
        let Some(descriptor) = descriptor else {
            continue;
        };
        let stem_id: StemId = descriptor.stem_id;
        let cdn_url = descriptor.cdn_url.clone();
        let expected_size = descriptor.expected_byte_size;

        let stem = cache.get_or_insert(&stem_id, || {
            let bytes = fetcher.fetch(&stem_id, cdn_url.as_deref(), expected_size)?;
            decode_stem(stem_id, &bytes, device_sample_rate)
        });

        riff = riff.with_stem(
            slot,
            Some(stem),
            descriptor.time_scale,
            descriptor.gain,
            descriptor.repetitions,
        );
    }

    Some(riff)
}

/// `Riff::new` debug-asserts `length_in_samples % bar_count == 0`; native
/// metadata rescaled to the device rate can drift off that exactly, so
/// round down to the nearest bar boundary before constructing the shell.
fn round_to_bar_multiple(length_in_samples: u64, bar_count: u32) -> u64 {
    if bar_count == 0 {
        return 0;
    }
    let bar_count = u64::from(bar_count);
    (length_in_samples / bar_count) * bar_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{RiffComplete, StaticResolver, StemDescriptor};
    use riffwork_core::STEM_SLOTS;
    use std::sync::mpsc;

    fn riff_with_one_stem() -> RiffComplete {
        let mut stems: [Option<StemDescriptor>; STEM_SLOTS] = Default::default();
        stems[0] = Some(StemDescriptor {
            stem_id: StemId::from_str_lossy("stem-0"),
            cdn_url: None,
            expected_byte_size: None,
            time_scale: 1.0,
            gain: 1.0,
            repetitions: 1,
        });
        RiffComplete {
            riff_id: RiffId::from_str_lossy("riff-with-stem"),
            bpm: 120.0,
            quarter_beats: 4,
            bar_count: 4,
            native_sample_rate: 44100,
            length_in_native_samples: 4 * 44100,
            cid_hash: 0,
            stems,
        }
    }

    #[test]
    fn unresolvable_riff_publishes_none() {
        let resolver: Arc<dyn RiffResolver> = Arc::new(StaticResolver::new());
        let cache = Arc::new(StemCache::new());
        let dir = tempfile::tempdir().unwrap();
        let disk_cache = DiskCache::new(dir.path());

        let (tx, rx) = mpsc::channel();
        let (clear_tx, _clear_rx) = mpsc::channel();
        let pipeline = RiffPipeline::spawn(
            resolver,
            cache,
            disk_cache,
            44100,
            move |resolved: RiffResolved| {
                tx.send((resolved.riff_id, resolved.riff.is_some())).unwrap();
            },
            move || {
                let _ = clear_tx.send(());
            },
        );

        pipeline.request_riff(RiffId::from_str_lossy("missing"), None);
        let (id, found) = rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
        assert_eq!(id, RiffId::from_str_lossy("missing"));
        assert!(!found);
    }

    #[test]
    fn request_clear_invokes_callback() {
        let resolver: Arc<dyn RiffResolver> = Arc::new(StaticResolver::new());
        let cache = Arc::new(StemCache::new());
        let dir = tempfile::tempdir().unwrap();
        let disk_cache = DiskCache::new(dir.path());

        let (_tx, _rx) = mpsc::channel::<()>();
        let (clear_tx, clear_rx) = mpsc::channel();
        let pipeline = RiffPipeline::spawn(
            resolver,
            cache,
            disk_cache,
            44100,
            |_resolved: RiffResolved| {},
            move || clear_tx.send(()).unwrap(),
        );

        pipeline.request_clear();
        clear_rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn bar_multiple_rounding_is_exact() {
        assert_eq!(round_to_bar_multiple(4 * 44100 + 3, 4), 4 * 44100);
        assert_eq!(round_to_bar_multiple(100, 0), 0);
    }
}
