mod abandon;
mod dropped_frames;
mod insufficient_buffer;
mod set;

pub use abandon::{AbandonOptions, AbandonRequestsRule};
pub use dropped_frames::{DroppedFramesOptions, DroppedFramesRule};
pub use insufficient_buffer::{BufferRatios, BufferThresholds, InsufficientBufferRule};
pub use set::RuleSet;

use crate::{RuleName, RulesContext, SwitchRequest};

/// Rule consulted on every ABR evaluation tick for the highest quality index
/// it allows.
pub trait MaxIndexRule {
    fn name(&self) -> RuleName;

    fn max_index(&mut self, ctx: &RulesContext<'_>) -> SwitchRequest;

    /// Drop all accumulated state.
    fn reset(&mut self);

    /// Playback seeked. Rules without timeline state ignore it.
    fn on_seek(&mut self) {}
}
