//! Riffwork Cache — a thread-safe, memory-bounded store of decoded
//! [`Stem`](riffwork_core::Stem) instances.
//!
//! The cache is the strong-reference anchor for every stem in memory:
//! riffs hold additional `Arc` clones while they're live, but the cache's
//! own map entry is what keeps a stem decoded at all. [`StemCache::prune`]
//! walks entries in least-recently-used order and drops the cache's own
//! reference to the coldest ones — a stem only actually deallocates once
//! every riff referencing it has also let go.

mod cache;

pub use cache::StemCache;
