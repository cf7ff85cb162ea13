//! Riffwork Pipeline — resolves riff identifiers to fully-loaded riffs on
//! a single background worker, fetching and decoding stems through the
//! shared [`riffwork_cache::StemCache`] along the way.

mod decode;
mod disk_cache;
mod error;
mod fetch;
mod pipeline;
mod resolver;

pub use disk_cache::DiskCache;
pub use error::{PipelineError, Result};
pub use pipeline::{RiffPipeline, RiffResolved};
pub use resolver::{HttpResolver, NullResolver, RiffComplete, RiffIdent, RiffResolver, StaticResolver, StemDescriptor};
