//! The stem cache itself: a memory-bounded, LRU-pruned map of decoded
//! stems shared across the fetch pipeline, the mix engine and the disk
//! recorder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use riffwork_core::{SharedStem, Stem, StemFingerprint, StemId};

/// A decode-in-progress or decoded slot. Callers racing to resolve the
/// same stem id share one `Slot`: the first caller to observe `None` runs
/// the decode while holding `inner` locked; every other caller blocks on
/// the same lock and receives the result once it's ready. This is the
/// "at-most-one decode per stem id" guarantee.
struct Slot {
    inner: Mutex<Option<SharedStem>>,
}

impl Slot {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(None),
        })
    }
}

struct Entry {
    stem: SharedStem,
    last_used: AtomicU64,
}

/// Thread-safe, memory-bounded cache of decoded stems.
///
/// All public methods are safe under concurrent calls: the slot map is
/// guarded by one mutex, but each in-flight decode holds only its own
/// per-stem slot lock, so a slow decode never blocks lookups of other
/// stems.
pub struct StemCache {
    slots: Mutex<HashMap<StemFingerprint, Arc<Slot>>>,
    entries: Mutex<HashMap<StemFingerprint, Entry>>,
    /// Candidates from a prior prune pass that were still referenced
    /// externally; retried on the next prune.
    parked: Mutex<Vec<StemFingerprint>>,
    clock: AtomicU64,
}

impl Default for StemCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StemCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            entries: Mutex::new(HashMap::new()),
            parked: Mutex::new(Vec::new()),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn touch(&self, fingerprint: StemFingerprint, tick: u64) {
        if let Some(entry) = self.entries.lock().get(&fingerprint) {
            entry.last_used.store(tick, Ordering::Relaxed);
        }
    }

    /// Non-blocking read: returns a cached stem without ever running a
    /// decode.
    pub fn lookup(&self, stem_id: &StemId) -> Option<SharedStem> {
        let fingerprint = StemFingerprint::of(stem_id);
        let stem = self.entries.lock().get(&fingerprint).map(|e| e.stem.clone());
        if stem.is_some() {
            self.touch(fingerprint, self.tick());
        }
        stem
    }

    /// Return a cached stem, decoding via `decode_fn` on a miss.
    /// Concurrent callers for the same `stem_id` share a single decode.
    /// A decode failure (closure returns `None`) is recorded as a
    /// [`Stem::failed`] entry to prevent retry storms — "failed to decode"
    /// is a normal, cacheable outcome, not an error, so this returns a
    /// plain `SharedStem`.
    pub fn get_or_insert(
        &self,
        stem_id: &StemId,
        decode_fn: impl FnOnce() -> Option<Stem>,
    ) -> SharedStem {
        let fingerprint = StemFingerprint::of(stem_id);

        if let Some(stem) = self.entries.lock().get(&fingerprint).map(|e| e.stem.clone()) {
            self.touch(fingerprint, self.tick());
            return stem;
        }

        let slot = self
            .slots
            .lock()
            .entry(fingerprint)
            .or_insert_with(Slot::empty)
            .clone();

        let mut guard = slot.inner.lock();
        if let Some(stem) = guard.as_ref() {
            let stem = stem.clone();
            drop(guard);
            self.slots.lock().remove(&fingerprint);
            self.publish(fingerprint, stem.clone());
            return stem;
        }

        let stem: SharedStem = Arc::new(decode_fn().unwrap_or_else(|| Stem::failed(*stem_id)));
        *guard = Some(stem.clone());
        drop(guard);
        self.slots.lock().remove(&fingerprint);
        self.publish(fingerprint, stem.clone());
        stem
    }

    fn publish(&self, fingerprint: StemFingerprint, stem: SharedStem) {
        let tick = self.tick();
        self.entries
            .lock()
            .entry(fingerprint)
            .or_insert_with(|| Entry {
                stem,
                last_used: AtomicU64::new(tick),
            });
    }

    /// Sum of [`Stem::estimated_bytes`] across every cached stem.
    pub fn estimate_memory_bytes(&self) -> u64 {
        self.entries
            .lock()
            .values()
            .map(|e| e.stem.estimated_bytes())
            .sum()
    }

    /// Evict least-recently-used stems until estimated usage is at or
    /// below `target_bytes`. A stem with outstanding external strong
    /// references (anything beyond the cache's own `Arc`) is skipped and
    /// parked for the next prune pass rather than evicted.
    pub fn prune(&self, target_bytes: u64) {
        let mut entries = self.entries.lock();

        let mut candidates: Vec<StemFingerprint> = entries.keys().copied().collect();
        candidates.sort_by_key(|fp| entries[fp].last_used.load(Ordering::Relaxed));

        let mut usage: u64 = entries.values().map(|e| e.stem.estimated_bytes()).sum();
        let mut still_parked = Vec::new();

        for fingerprint in candidates {
            if usage <= target_bytes {
                break;
            }
            let Some(entry) = entries.get(&fingerprint) else {
                continue;
            };
            // Cache holds one Arc; strong_count == 1 means nobody else
            // (no live Riff) references this stem right now.
            if Arc::strong_count(&entry.stem) > 1 {
                still_parked.push(fingerprint);
                continue;
            }
            let bytes = entry.stem.estimated_bytes();
            entries.remove(&fingerprint);
            usage = usage.saturating_sub(bytes);
            tracing::debug!(fingerprint = %fingerprint, bytes, "evicted stem from cache");
        }

        *self.parked.lock() = still_parked;
    }

    /// Number of stems currently resident (for diagnostics/tests).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
