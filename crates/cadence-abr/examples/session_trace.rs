//! Replay a synthetic playback session through the rule set and log every
//! decision.
//!
//! ```
//! RUST_LOG=cadence_abr=trace cargo run -p cadence-abr --example session_trace
//! ```

use std::{error::Error, time::Duration};

use cadence_abr::{
    BufferSample, BufferState, FrameSample, Ladder, MediaType, ParamTable, RuleSet, RulesContext,
    SeekSignal, SegmentRequest,
};
use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::EnvFilter;
use web_time::Instant;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .from_env_lossy(),
        )
        .with_line_number(false)
        .with_file(false)
        .init();

    let ladder = Ladder::from_bandwidths([(
        MediaType::Video,
        vec![400_000, 1_200_000, 2_500_000, 5_000_000],
    )])?;
    let params = ParamTable::from_json(r#"{ "video": { "ABR.droppedFramesMaxRatio": 0.25 } }"#)?;
    let seek = SeekSignal::new();
    let mut rules = RuleSet::new(ladder, params).with_seek_signal(seek.clone());

    let min_buffer = Duration::from_secs(12);
    let mut current = 3_usize;
    let mut frames = vec![FrameSample::new(0, 0)];

    // (buffer level, buffer state, dropped frames per 120 rendered)
    let ticks = [
        (2.0, BufferState::Buffering, 0),
        (8.0, BufferState::Loaded, 2),
        (14.0, BufferState::Loaded, 20),
        (9.0, BufferState::Loaded, 45),
        (5.0, BufferState::Loaded, 4),
        (2.5, BufferState::Buffering, 1),
    ];

    for (tick, (level, state, dropped)) in ticks.into_iter().enumerate() {
        frames.push(FrameSample::new(dropped, 120));
        let buffer = [BufferSample::new(level, state)];
        let ctx = RulesContext::new(MediaType::Video, current)
            .with_manifest_min_buffer_time(min_buffer)
            .with_frame_history(&frames)
            .with_buffer_samples(&buffer);

        let requests = rules.max_index_requests(&ctx);
        // Naive stand-in for the host combiner: lowest requested index wins.
        if let Some(lowest) = requests.iter().filter_map(|r| r.quality()).min() {
            current = lowest;
        }
        info!(tick, level, current, ?requests, "tick");
    }

    seek.notify();
    info!("seeked");

    let first_byte_at = Instant::now();
    let request = SegmentRequest {
        bytes_loaded: 120_000,
        first_byte_at: Some(first_byte_at),
        ..SegmentRequest::new(MediaType::Video, 2_000_000, Duration::from_secs(4))
    };
    let ctx = RulesContext::new(MediaType::Video, current).with_request(&request);
    let decision = rules.should_abandon(&ctx, first_byte_at + Duration::from_secs(3));
    info!(?decision, "download progress");

    Ok(())
}
