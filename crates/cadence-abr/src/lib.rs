//! Heuristic ABR switch rules for segmented streaming.
//!
//! Three independent rules look at different symptoms and each returns a
//! [`SwitchRequest`]:
//!
//! - [`AbandonRequestsRule`]: the segment in flight will not arrive in time,
//!   drop to a quality the measured bandwidth can sustain.
//! - [`DroppedFramesRule`]: the renderer is dropping video frames, hold or
//!   step down.
//! - [`InsufficientBufferRule`]: the playback buffer is running short, step
//!   down or fall to the lowest quality.
//!
//! Rules never merge their answers. Arbitration by [`Priority`] is left to the
//! host, which also owns the ladder, the metrics and the configuration; rules
//! reach them through [`QualityLadder`], [`RulesContext`] and [`ParamSource`].
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use cadence_abr::{
//!     BufferSample, BufferState, Ladder, MediaType, ParamTable, Priority, RuleSet,
//!     RulesContext,
//! };
//!
//! let ladder = Ladder::from_bandwidths([(MediaType::Video, vec![400_000, 1_200_000, 3_000_000])])?;
//! let mut rules = RuleSet::new(ladder, ParamTable::new());
//!
//! let samples = [BufferSample::new(1.0, BufferState::Loaded)];
//! let ctx = RulesContext::new(MediaType::Video, 2)
//!     .with_manifest_min_buffer_time(Duration::from_secs(8))
//!     .with_buffer_samples(&samples);
//!
//! let requests = rules.max_index_requests(&ctx);
//! assert!(requests
//!     .iter()
//!     .any(|r| r.quality() == Some(0) && r.priority() == Priority::Strong));
//! # Ok::<(), cadence_abr::AbrError>(())
//! ```

#![forbid(unsafe_code)]

mod context;
mod error;
mod ladder;
pub mod params;
mod rules;
mod seek;
mod types;

pub use context::{BufferSample, BufferState, FrameSample, RulesContext, SegmentRequest};
pub use error::{AbrError, AbrResult};
pub use ladder::{Ladder, QualityLadder, Variant};
pub use params::{ParamSource, ParamTable, number_param};
pub use rules::{
    AbandonOptions, AbandonRequestsRule, BufferRatios, BufferThresholds, DroppedFramesOptions,
    DroppedFramesRule, InsufficientBufferRule, MaxIndexRule, RuleSet,
};
pub use seek::SeekSignal;
pub use types::{MediaTable, MediaType, Priority, RuleName, SwitchRequest};
