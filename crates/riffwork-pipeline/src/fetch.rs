//! Stem byte fetch: disk cache first, CDN download on miss.

use riffwork_core::StemId;

use crate::disk_cache::DiskCache;

/// How far `expected_byte_size` may be off from the actual download
/// before it's treated as a problem worth logging.
const SIZE_TOLERANCE: f64 = 0.05;

/// Resolves a stem's raw bytes, preferring the on-disk cache and falling
/// back to a CDN GET, persisting the download atomically on success.
pub struct StemFetcher {
    disk_cache: DiskCache,
    http: reqwest::blocking::Client,
}

impl StemFetcher {
    #[must_use]
    pub fn new(disk_cache: DiskCache) -> Self {
        Self {
            disk_cache,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch raw bytes for `stem_id`. Returns `None` on any failure
    /// (missing locally and no CDN URL, network error, non-success
    /// status) — the caller records that as a failed stem.
    pub fn fetch(
        &self,
        stem_id: &StemId,
        cdn_url: Option<&str>,
        expected_byte_size: Option<u64>,
    ) -> Option<Vec<u8>> {
        if let Some(bytes) = self.disk_cache.read(stem_id) {
            return Some(bytes);
        }

        let url = cdn_url?;
        let response = self.http.get(url).send().ok()?;
        if !response.status().is_success() {
            tracing::warn!(%stem_id, status = %response.status(), "stem download failed");
            return None;
        }
        let bytes = response.bytes().ok()?.to_vec();

        if let Some(expected) = expected_byte_size {
            check_size_tolerance(stem_id, bytes.len() as u64, expected);
        }

        if let Err(err) = self.disk_cache.write_atomic(stem_id, &bytes) {
            tracing::warn!(%stem_id, %err, "failed to persist downloaded stem to disk cache");
        }

        Some(bytes)
    }
}

fn check_size_tolerance(stem_id: &StemId, actual: u64, expected: u64) {
    if expected == 0 {
        return;
    }
    let diff = (actual as f64 - expected as f64).abs() / expected as f64;
    if diff > SIZE_TOLERANCE {
        tracing::warn!(
            %stem_id,
            actual,
            expected,
            "downloaded stem size differs from expected by more than tolerance"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_prefers_disk_cache_over_network() {
        let dir = tempfile::tempdir().unwrap();
        let disk_cache = DiskCache::new(dir.path());
        let stem_id = StemId::from_str_lossy("cached-stem");
        disk_cache.write_atomic(&stem_id, b"already-cached").unwrap();

        let fetcher = StemFetcher::new(disk_cache);
        // No cdn_url at all: if this reached the network path it would
        // return None immediately, so a Some(...) here proves the disk
        // cache was consulted first.
        let bytes = fetcher.fetch(&stem_id, None, None);
        assert_eq!(bytes.as_deref(), Some(b"already-cached".as_slice()));
    }

    #[test]
    fn fetch_returns_none_without_cache_or_url() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StemFetcher::new(DiskCache::new(dir.path()));
        let stem_id = StemId::from_str_lossy("nowhere");
        assert!(fetcher.fetch(&stem_id, None, None).is_none());
    }
}
