use web_time::Instant;

use super::{AbandonRequestsRule, DroppedFramesRule, InsufficientBufferRule, MaxIndexRule};
use crate::{ParamSource, QualityLadder, RulesContext, SeekSignal, SwitchRequest};

/// One instance of every rule for a player session.
///
/// Returns each rule's request unmerged; combining them by priority is the
/// host's job.
#[derive(Clone, Debug)]
pub struct RuleSet<L, P> {
    abandon: AbandonRequestsRule<L>,
    dropped_frames: DroppedFramesRule<P>,
    insufficient_buffer: InsufficientBufferRule<P>,
}

impl<L: QualityLadder, P: ParamSource + Clone> RuleSet<L, P> {
    pub fn new(ladder: L, params: P) -> Self {
        Self {
            abandon: AbandonRequestsRule::new(ladder),
            dropped_frames: DroppedFramesRule::new(params.clone()),
            insufficient_buffer: InsufficientBufferRule::new(params),
        }
    }
}

impl<L: QualityLadder, P: ParamSource> RuleSet<L, P> {
    pub fn from_rules(
        abandon: AbandonRequestsRule<L>,
        dropped_frames: DroppedFramesRule<P>,
        insufficient_buffer: InsufficientBufferRule<P>,
    ) -> Self {
        Self {
            abandon,
            dropped_frames,
            insufficient_buffer,
        }
    }

    #[must_use]
    pub fn with_seek_signal(mut self, signal: SeekSignal) -> Self {
        self.insufficient_buffer = self.insufficient_buffer.with_seek_signal(signal);
        self
    }

    pub fn abandon(&self) -> &AbandonRequestsRule<L> {
        &self.abandon
    }

    pub fn dropped_frames(&self) -> &DroppedFramesRule<P> {
        &self.dropped_frames
    }

    pub fn insufficient_buffer(&self) -> &InsufficientBufferRule<P> {
        &self.insufficient_buffer
    }

    /// Download progress tick.
    pub fn should_abandon(&self, ctx: &RulesContext<'_>, now: Instant) -> SwitchRequest {
        self.abandon.should_abandon(ctx, now)
    }

    /// ABR evaluation tick: one request per max-index rule.
    pub fn max_index_requests(&mut self, ctx: &RulesContext<'_>) -> Vec<SwitchRequest> {
        self.max_index_rules()
            .into_iter()
            .map(|rule| {
                let request = rule.max_index(ctx);
                tracing::trace!(
                    rule = %rule.name(),
                    media = %ctx.media_type,
                    quality = ?request.quality(),
                    "rule evaluated"
                );
                request
            })
            .collect()
    }

    pub fn on_seek(&mut self) {
        for rule in self.max_index_rules() {
            rule.on_seek();
        }
    }

    pub fn reset(&mut self) {
        self.abandon.reset();
        for rule in self.max_index_rules() {
            rule.reset();
        }
    }

    fn max_index_rules(&mut self) -> [&mut dyn MaxIndexRule; 2] {
        [&mut self.dropped_frames, &mut self.insufficient_buffer]
    }
}
