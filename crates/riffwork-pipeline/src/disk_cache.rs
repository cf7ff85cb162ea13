//! On-disk content-addressed cache of raw stem bytes.
//!
//! Files are laid out by the stem's fingerprint hex string split into a
//! two-character prefix directory, mirroring the original's hash-prefix
//! fan-out (keeps any single directory from growing to tens of thousands
//! of entries). Writes are atomic: bytes land in a temp file in the same
//! directory, then `rename` swaps it into place, so a reader never
//! observes a partially-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use riffwork_core::{StemFingerprint, StemId};

/// Root of the on-disk stem cache.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a stem's raw bytes would live at, whether or not it exists yet.
    ///
    /// Layout is `<first 2 hex of hash>/<stem_id>`: the hash prefix fans out
    /// the directory, the stem id itself names the file so a directory
    /// listing stays human-readable.
    #[must_use]
    pub fn path_for(&self, stem_id: &StemId) -> PathBuf {
        let fingerprint = StemFingerprint::of(stem_id).to_string();
        let prefix = &fingerprint[..2];
        self.root.join(prefix).join(stem_id.to_string())
    }

    /// Read cached bytes for `stem_id`, if present.
    pub fn read(&self, stem_id: &StemId) -> Option<Vec<u8>> {
        fs::read(self.path_for(stem_id)).ok()
    }

    /// Atomically write `bytes` for `stem_id`: a temp file in the same
    /// directory as the final path, then `rename` into place.
    pub fn write_atomic(&self, stem_id: &StemId, bytes: &[u8]) -> std::io::Result<()> {
        let final_path = self.path_for(stem_id);
        let dir = final_path
            .parent()
            .expect("path_for always nests under a prefix directory");
        fs::create_dir_all(dir)?;

        let tmp_path = temp_path_in(dir);
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

fn temp_path_in(dir: &Path) -> PathBuf {
    // Process id + a monotonic counter keep concurrent writers from
    // colliding on the temp filename within one process or across processes.
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".tmp-{}-{}", std::process::id(), n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let stem_id = StemId::from_str_lossy("disk-cache-test");

        assert!(cache.read(&stem_id).is_none());
        cache.write_atomic(&stem_id, b"fLaC-payload").unwrap();
        assert_eq!(cache.read(&stem_id).unwrap(), b"fLaC-payload");
    }

    #[test]
    fn temp_file_is_not_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let stem_id = StemId::from_str_lossy("no-leftovers");
        cache.write_atomic(&stem_id, b"data").unwrap();

        let prefix_dir = cache.path_for(&stem_id).parent().unwrap().to_path_buf();
        let leftover_tmp = fs::read_dir(&prefix_dir)
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| entry.file_name().to_string_lossy().starts_with(".tmp-"));
        assert!(!leftover_tmp, "rename must remove the temp file");
    }
}
