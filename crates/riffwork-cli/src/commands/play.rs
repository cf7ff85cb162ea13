//! Demo playback command: wires the fetch pipeline, stem cache, mix engine
//! and audio device together and plays a single riff.
//!
//! This is the "host binary" referenced throughout the other crates' docs
//! — it resolves exactly one riff id through
//! whatever resolver is configured and streams the mix engine's output to
//! an audio device until `--duration` elapses.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use riffwork_cache::StemCache;
use riffwork_core::RiffId;
use riffwork_io::{AudioStream, StreamConfig};
use riffwork_pipeline::{DiskCache, HttpResolver, NullResolver, RiffPipeline, RiffResolver};

#[derive(Args)]
pub struct PlayArgs {
    /// Riff identifier to resolve and play.
    riff_id: String,

    /// Base URL of a riff-metadata HTTP endpoint (see
    /// `riffwork_pipeline::HttpResolver`). Without this, the command uses
    /// a resolver that never finds anything, which demonstrates the
    /// wiring but produces silence.
    #[arg(long)]
    resolver_url: Option<String>,

    /// Output device (exact name, partial name, or index; see `devices list`).
    #[arg(short, long)]
    output: Option<String>,

    /// How long to keep streaming before stopping, in seconds.
    #[arg(long, default_value = "10")]
    duration: u64,

    /// Output sample rate in Hz.
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Output buffer size in frames.
    #[arg(long, default_value = "512")]
    buffer_size: u32,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let config = riffwork_config::Config::load_default()?;

    let stem_cache_dir = riffwork_config::paths::stems_cache_root(&config.data.storage_root);
    let disk_cache = DiskCache::new(stem_cache_dir);
    let stem_cache = Arc::new(StemCache::new());

    let resolver: Arc<dyn RiffResolver> = match &args.resolver_url {
        Some(url) => Arc::new(HttpResolver::new(url.clone())),
        None => {
            tracing::warn!("no --resolver-url given; riff will not resolve, playing silence");
            Arc::new(NullResolver)
        }
    };

    let (mut handle, mut engine) =
        riffwork_mixer::build(args.sample_rate, args.buffer_size as usize * 2);

    let pipeline = RiffPipeline::spawn(
        resolver,
        stem_cache,
        disk_cache,
        args.sample_rate,
        {
            let riff_id_display = args.riff_id.clone();
            move |resolved| match resolved.riff {
                Some(riff) => {
                    println!("riff {riff_id_display} resolved, enqueueing for playback");
                    if let Err(err) = handle.enqueue_riff(Arc::new(riff)) {
                        tracing::error!(%err, "failed to enqueue resolved riff");
                    }
                }
                None => {
                    println!("riff {riff_id_display} could not be resolved");
                }
            }
        },
        || {},
    );

    let riff_id = RiffId::from_str_lossy(&args.riff_id);
    pipeline.request_riff(riff_id, None);

    let stream_config = StreamConfig {
        sample_rate: args.sample_rate,
        buffer_size: args.buffer_size,
        input_device: None,
        output_device: args.output.clone(),
    };
    let mut stream = AudioStream::new(stream_config)?;

    println!(
        "Streaming for {}s (sample rate {} Hz, buffer {} frames)...",
        args.duration, args.sample_rate, args.buffer_size
    );

    let duration = Duration::from_secs(args.duration);
    let deadline = std::time::Instant::now() + duration;
    stream.run_output_for(deadline, move |data: &mut [f32]| {
        engine.process(data);
    })?;

    println!("Done!");
    Ok(())
}
