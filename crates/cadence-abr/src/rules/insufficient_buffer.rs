use std::time::Duration;

use derivative::Derivative;

use super::MaxIndexRule;
use crate::{
    BufferState, MediaTable, MediaType, ParamSource, Priority, RuleName, RulesContext, SeekSignal,
    SwitchRequest, number_param, params::keys,
};

/// Built-in threshold ratios, relative to the minimum buffer time.
#[derive(Clone, Debug, Derivative, PartialEq)]
#[derivative(Default)]
pub struct BufferRatios {
    #[derivative(Default(value = "0.25"))]
    pub switch_lower: f64,
    #[derivative(Default(value = "0.5"))]
    pub switch_down: f64,
    #[derivative(Default(value = "0.75"))]
    pub switch_up: f64,
}

/// Buffer thresholds in seconds resolved for one media type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferThresholds {
    pub min_buffer_time: f64,
    /// At or below: force the lowest quality.
    pub switch_lower: f64,
    /// At or below: step down once.
    pub switch_down: f64,
    /// Resolved for configuration compatibility; no decision reads it yet.
    pub switch_up: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BufferInfo {
    state: BufferState,
    first_buffer_loaded: bool,
}

/// Lowers quality when the playback buffer runs short.
///
/// Before the buffer of a media type has ever been loaded, low levels are
/// tolerated so the initial fill does not punish quality. A seek clears that
/// history.
#[derive(Clone, Debug)]
pub struct InsufficientBufferRule<P> {
    params: P,
    ratios: BufferRatios,
    buffer_info: MediaTable<BufferInfo>,
    seek: Option<SeekSignal>,
    seen_seek_generation: u64,
}

impl<P: ParamSource> InsufficientBufferRule<P> {
    pub fn new(params: P) -> Self {
        Self::with_ratios(params, BufferRatios::default())
    }

    pub fn with_ratios(params: P, ratios: BufferRatios) -> Self {
        Self {
            params,
            ratios,
            buffer_info: MediaTable::new(),
            seek: None,
            seen_seek_generation: 0,
        }
    }

    /// Observe `signal` and drop buffer history whenever it fires.
    #[must_use]
    pub fn with_seek_signal(mut self, signal: SeekSignal) -> Self {
        self.seen_seek_generation = signal.generation();
        self.seek = Some(signal);
        self
    }

    /// Whether the buffer of `media_type` has been loaded since the last seek
    /// or reset.
    pub fn has_loaded(&self, media_type: MediaType) -> bool {
        self.buffer_info
            .get(media_type)
            .is_some_and(|info| info.first_buffer_loaded)
    }

    /// Latest buffer state recorded for `media_type`.
    pub fn buffer_state(&self, media_type: MediaType) -> Option<BufferState> {
        self.buffer_info.get(media_type).map(|info| info.state)
    }

    pub fn thresholds(
        &self,
        media_type: MediaType,
        manifest_min_buffer_time: Duration,
    ) -> BufferThresholds {
        let param = |key, default| number_param(&self.params, media_type, key, default);

        let min_buffer_time =
            param(keys::MIN_BUFFER_TIME, manifest_min_buffer_time.as_secs_f64());
        let lower_ratio = param(keys::SWITCH_LOWER_BUFFER_RATIO, self.ratios.switch_lower);
        let down_ratio = param(keys::SWITCH_DOWN_BUFFER_RATIO, self.ratios.switch_down);
        let up_ratio = param(keys::SWITCH_UP_BUFFER_RATIO, self.ratios.switch_up);

        BufferThresholds {
            min_buffer_time,
            switch_lower: param(keys::SWITCH_LOWER_BUFFER_TIME, lower_ratio * min_buffer_time),
            switch_down: param(keys::SWITCH_DOWN_BUFFER_TIME, down_ratio * min_buffer_time),
            switch_up: param(keys::SWITCH_UP_BUFFER_TIME, up_ratio * min_buffer_time),
        }
    }

    pub fn max_index(&mut self, ctx: &RulesContext<'_>) -> SwitchRequest {
        self.sync_seek();

        let no_change = SwitchRequest::no_change(RuleName::InsufficientBuffer);
        let media_type = ctx.media_type;

        let Some(latest) = ctx.last_buffer_sample() else {
            return no_change;
        };
        let level = latest.level_secs;
        if level == 0.0 {
            return no_change;
        }

        let first_buffer_loaded = self.set_buffer_info(media_type, latest.state);
        let thresholds = self.thresholds(media_type, ctx.manifest_min_buffer_time);

        if level < thresholds.switch_down && !first_buffer_loaded {
            tracing::trace!(
                media = %media_type,
                level,
                switch_down = thresholds.switch_down,
                "initial fill, buffer rule idle"
            );
            return no_change;
        }

        let decision = if level <= thresholds.switch_lower {
            SwitchRequest::to_quality(0, Priority::Strong, RuleName::InsufficientBuffer)
        } else if level <= thresholds.switch_down {
            SwitchRequest::to_quality(
                ctx.current_quality.saturating_sub(1),
                Priority::Default,
                RuleName::InsufficientBuffer,
            )
        } else {
            no_change
        };

        tracing::debug!(
            media = %media_type,
            level,
            switch_lower = thresholds.switch_lower,
            switch_down = thresholds.switch_down,
            quality = ?decision.quality(),
            priority = %decision.priority(),
            "insufficient buffer decision"
        );
        decision
    }

    /// Playback seeked: buffer history no longer describes the timeline.
    pub fn on_seek(&mut self) {
        tracing::debug!("seek, clearing buffer history");
        self.buffer_info.clear();
    }

    pub fn reset(&mut self) {
        self.buffer_info.clear();
        if let Some(signal) = &self.seek {
            self.seen_seek_generation = signal.generation();
        }
    }

    /// Returns whether the buffer has been loaded at least once.
    fn set_buffer_info(&mut self, media_type: MediaType, state: BufferState) -> bool {
        let info = self
            .buffer_info
            .get_or_insert_with(media_type, || BufferInfo {
                state,
                first_buffer_loaded: false,
            });
        info.state = state;
        if state == BufferState::Loaded && !info.first_buffer_loaded {
            tracing::debug!(media = %media_type, "first buffer loaded");
            info.first_buffer_loaded = true;
        }
        info.first_buffer_loaded
    }

    fn sync_seek(&mut self) {
        let Some(generation) = self.seek.as_ref().map(SeekSignal::generation) else {
            return;
        };
        if generation != self.seen_seek_generation {
            self.seen_seek_generation = generation;
            self.on_seek();
        }
    }
}

impl<P: ParamSource> MaxIndexRule for InsufficientBufferRule<P> {
    fn name(&self) -> RuleName {
        RuleName::InsufficientBuffer
    }

    fn max_index(&mut self, ctx: &RulesContext<'_>) -> SwitchRequest {
        InsufficientBufferRule::max_index(self, ctx)
    }

    fn reset(&mut self) {
        InsufficientBufferRule::reset(self);
    }

    fn on_seek(&mut self) {
        InsufficientBufferRule::on_seek(self);
    }
}
