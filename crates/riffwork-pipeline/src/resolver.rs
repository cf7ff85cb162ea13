//! Riff metadata resolution: local durable metadata first, falling back to
//! the network when authenticated.
//!
//! Both the Warehouse (local) and the network CDN client are out of scope
//! for this crate (Non-goals); what's implemented here is the trait
//! boundary and the stub/test resolvers, plus an `HttpResolver` that shows
//! the real shape against a generic JSON metadata endpoint.

use riffwork_core::{RiffId, StemId};

/// Where a stem's audio bytes can be fetched from.
#[derive(Debug, Clone)]
pub struct StemDescriptor {
    pub stem_id: StemId,
    /// `None` means "expect this stem already in the on-disk cache";
    /// `Some(url)` is a CDN URL to GET on cache miss.
    pub cdn_url: Option<String>,
    /// Size in bytes the CDN told us to expect, if any.
    pub expected_byte_size: Option<u64>,
    pub time_scale: f32,
    pub gain: f32,
    pub repetitions: u32,
}

/// Fully resolved riff metadata, prior to any stem being decoded.
#[derive(Debug, Clone)]
pub struct RiffComplete {
    pub riff_id: RiffId,
    pub bpm: f32,
    pub quarter_beats: u32,
    pub bar_count: u32,
    /// Riff length at its own native sample rate; the pipeline rescales to
    /// the device rate once stems are decoded and the actual device
    /// sample rate is known.
    pub native_sample_rate: u32,
    pub length_in_native_samples: u64,
    pub cid_hash: u64,
    /// Up to [`riffwork_core::STEM_SLOTS`] stem slots; `None` for an
    /// unauthored slot.
    pub stems: [Option<StemDescriptor>; riffwork_core::STEM_SLOTS],
}

/// Identifies a riff to resolve — either a concrete id or "whatever comes
/// next for this jam", mirroring the original's two entry points into
/// riff resolution.
#[derive(Debug, Clone)]
pub enum RiffIdent {
    Riff(RiffId),
}

/// Resolves riff identifiers to full metadata. Implementations may consult
/// local durable storage, a network API, or both.
pub trait RiffResolver: Send + Sync {
    /// Resolve `ident` to full metadata, or `None` if it cannot be found
    /// by any tier.
    fn resolve(&self, ident: &RiffIdent) -> Option<RiffComplete>;
}

/// Resolver that never finds anything. Useful as a default/placeholder
/// when no Warehouse or network backend is wired up.
#[derive(Debug, Default)]
pub struct NullResolver;

impl RiffResolver for NullResolver {
    fn resolve(&self, _ident: &RiffIdent) -> Option<RiffComplete> {
        None
    }
}

/// In-memory resolver backed by a fixed table, for tests and demos.
#[derive(Debug, Default)]
pub struct StaticResolver {
    riffs: std::collections::HashMap<RiffId, RiffComplete>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self {
            riffs: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_riff(mut self, riff: RiffComplete) -> Self {
        self.riffs.insert(riff.riff_id, riff);
        self
    }
}

impl RiffResolver for StaticResolver {
    fn resolve(&self, ident: &RiffIdent) -> Option<RiffComplete> {
        match ident {
            RiffIdent::Riff(id) => self.riffs.get(id).cloned(),
        }
    }
}

/// Resolver backed by a blocking HTTP GET against a metadata endpoint that
/// returns a JSON document shaped like [`RiffComplete`]'s wire form. This
/// demonstrates the shape of a real network resolver; authentication and
/// the Warehouse's own schema are non-goals.
pub struct HttpResolver {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpResolver {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl RiffResolver for HttpResolver {
    fn resolve(&self, ident: &RiffIdent) -> Option<RiffComplete> {
        let RiffIdent::Riff(id) = ident;
        let url = format!("{}/riffs/{}", self.base_url, id);
        let response = self.client.get(&url).send().ok()?;
        if !response.status().is_success() {
            tracing::debug!(%id, status = %response.status(), "riff resolve failed");
            return None;
        }
        response.json::<wire::RiffWire>().ok().map(|wire| wire.into_riff_complete(*id))
    }
}

/// Wire-format mirror of [`RiffComplete`], kept private: the network
/// schema is a non-goal, this is only illustrative of the conversion.
mod wire {
    use super::{RiffComplete, StemDescriptor};
    use riffwork_core::{RiffId, StemId, STEM_SLOTS};
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub struct StemWire {
        pub stem_id: String,
        pub cdn_url: Option<String>,
        pub expected_byte_size: Option<u64>,
        pub time_scale: f32,
        pub gain: f32,
        pub repetitions: u32,
    }

    #[derive(Deserialize)]
    pub struct RiffWire {
        pub bpm: f32,
        pub quarter_beats: u32,
        pub bar_count: u32,
        pub native_sample_rate: u32,
        pub length_in_native_samples: u64,
        pub cid_hash: u64,
        pub stems: Vec<Option<StemWire>>,
    }

    impl RiffWire {
        pub fn into_riff_complete(self, riff_id: RiffId) -> RiffComplete {
            let mut stems: [Option<StemDescriptor>; STEM_SLOTS] = Default::default();
            for (slot, stem) in self.stems.into_iter().take(STEM_SLOTS).enumerate() {
                stems[slot] = stem.map(|s| StemDescriptor {
                    stem_id: StemId::from_str_lossy(&s.stem_id),
                    cdn_url: s.cdn_url,
                    expected_byte_size: s.expected_byte_size,
                    time_scale: s.time_scale,
                    gain: s.gain,
                    repetitions: s.repetitions,
                });
            }
            RiffComplete {
                riff_id,
                bpm: self.bpm,
                quarter_beats: self.quarter_beats,
                bar_count: self.bar_count,
                native_sample_rate: self.native_sample_rate,
                length_in_native_samples: self.length_in_native_samples,
                cid_hash: self.cid_hash,
                stems,
            }
        }
    }
}
