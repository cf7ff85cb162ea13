//! Content-addressed identifiers for jams, riffs and stems.
//!
//! The Endlesss network identifies everything — jams, riffs, stems — by a
//! fixed-length opaque string handed out by the Warehouse/CDN. Riffwork
//! treats these as 24-byte blobs: it never interprets their contents, only
//! compares, hashes and hex-prints them.

use std::fmt;

/// Width of an Endlesss content identifier, in bytes.
pub const ID_BYTES: usize = 24;

macro_rules! content_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; ID_BYTES]);

        impl $name {
            /// Wrap raw identifier bytes.
            pub const fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
                Self(bytes)
            }

            /// Build an identifier from a UTF-8 string, truncating or
            /// zero-padding to [`ID_BYTES`]. Used for tests and for
            /// resolver stubs that work with human-readable ids.
            pub fn from_str_lossy(s: &str) -> Self {
                let mut bytes = [0u8; ID_BYTES];
                let src = s.as_bytes();
                let n = src.len().min(ID_BYTES);
                bytes[..n].copy_from_slice(&src[..n]);
                Self(bytes)
            }

            /// Raw identifier bytes.
            pub const fn as_bytes(&self) -> &[u8; ID_BYTES] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    };
}

content_id!(JamId, "Identifies a jam: a collection of riffs authored over time.");
content_id!(RiffId, "Identifies a single riff within a jam.");
content_id!(StemId, "Identifies a single audio stem within a riff.");

/// 64-bit hash of a [`StemId`], used as the in-memory [`crate::Stem`] cache
/// key so the cache doesn't have to hash the full 24-byte id on every
/// lookup on the audio-adjacent paths.
///
/// Derived with a fixed-seed `XxHash64` rather than a hand-rolled hash —
/// stable across runs (unlike `std`'s randomized `DefaultHasher`), which
/// matters because fingerprints end up in log lines and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StemFingerprint(u64);

impl StemFingerprint {
    /// Fixed seed so fingerprints are stable across process runs.
    const SEED: u64 = 0x5354_454D_4649_4E47; // "STEMFING" in ASCII hex

    /// Derive a fingerprint from a stem identifier.
    pub fn of(stem_id: &StemId) -> Self {
        use std::hash::Hasher;
        let mut hasher = twox_hash::XxHash64::with_seed(Self::SEED);
        hasher.write(stem_id.as_bytes());
        Self(hasher.finish())
    }

    /// Raw 64-bit value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StemFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_through_lossy_str() {
        let a = StemId::from_str_lossy("stem-0001");
        let b = StemId::from_str_lossy("stem-0001");
        let c = StemId::from_str_lossy("stem-0002");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishing() {
        let a = StemId::from_str_lossy("stem-a");
        let b = StemId::from_str_lossy("stem-b");
        assert_eq!(StemFingerprint::of(&a), StemFingerprint::of(&a));
        assert_ne!(StemFingerprint::of(&a), StemFingerprint::of(&b));
    }

    #[test]
    fn display_is_hex() {
        let id = StemId::from_bytes([0u8; ID_BYTES]);
        assert_eq!(id.to_string(), "0".repeat(ID_BYTES * 2));
    }
}
