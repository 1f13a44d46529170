use derivative::Derivative;

use super::MaxIndexRule;
use crate::{
    MediaType, ParamSource, Priority, RuleName, RulesContext, SwitchRequest, number_param,
    params::keys,
};

/// Built-in ratios, used when the parameter source has no value.
#[derive(Clone, Debug, Derivative, PartialEq)]
#[derivative(Default)]
pub struct DroppedFramesOptions {
    /// Above this ratio the rule forces one step down.
    #[derivative(Default(value = "0.30"))]
    pub max_ratio: f64,
    /// Above this ratio the rule holds the current quality.
    #[derivative(Default(value = "0.10"))]
    pub min_ratio: f64,
}

/// Protects smooth rendering by holding or lowering video quality when the
/// renderer drops frames.
///
/// Stateless: every call recomputes from the frame history snapshot.
#[derive(Clone, Debug)]
pub struct DroppedFramesRule<P> {
    params: P,
    opts: DroppedFramesOptions,
}

impl<P: ParamSource> DroppedFramesRule<P> {
    pub fn new(params: P) -> Self {
        Self::with_options(params, DroppedFramesOptions::default())
    }

    pub fn with_options(params: P, opts: DroppedFramesOptions) -> Self {
        Self { params, opts }
    }

    pub fn max_index(&self, ctx: &RulesContext<'_>) -> SwitchRequest {
        let media_type = ctx.media_type;
        if media_type != MediaType::Video {
            return SwitchRequest::no_change(RuleName::DroppedFrames);
        }

        let max_ratio = number_param(
            &self.params,
            media_type,
            keys::DROPPED_FRAMES_MAX_RATIO,
            self.opts.max_ratio,
        );
        let min_ratio = number_param(
            &self.params,
            media_type,
            keys::DROPPED_FRAMES_MIN_RATIO,
            self.opts.min_ratio,
        );
        let current = ctx.current_quality;

        let mut decision = SwitchRequest::no_change(RuleName::DroppedFrames);
        // Index 0 carries no interval to measure against.
        for sample in ctx.frame_history.iter().skip(1) {
            let (Some(dropped), Some(total)) = (sample.dropped_frames, sample.total_frames) else {
                continue;
            };
            if total == 0 {
                continue;
            }

            #[expect(clippy::cast_precision_loss)] // frame counters far below 2^52
            let ratio = dropped as f64 / total as f64;
            tracing::trace!(media = %media_type, dropped, total, ratio, "dropped frames sample");

            let candidate = if ratio > max_ratio && current > 0 {
                SwitchRequest::to_quality(current - 1, Priority::Strong, RuleName::DroppedFrames)
            } else if ratio > min_ratio {
                SwitchRequest::to_quality(current, Priority::Strong, RuleName::DroppedFrames)
            } else {
                SwitchRequest::no_change(RuleName::DroppedFrames)
            };
            decision = candidate.with_dropped_frames(dropped);
        }

        tracing::debug!(
            media = %media_type,
            quality = ?decision.quality(),
            priority = %decision.priority(),
            dropped_frames = ?decision.dropped_frames(),
            "dropped frames decision"
        );
        decision
    }
}

impl<P: ParamSource> MaxIndexRule for DroppedFramesRule<P> {
    fn name(&self) -> RuleName {
        RuleName::DroppedFrames
    }

    fn max_index(&mut self, ctx: &RulesContext<'_>) -> SwitchRequest {
        DroppedFramesRule::max_index(self, ctx)
    }

    fn reset(&mut self) {}
}
