use derivative::Derivative;
use web_time::Instant;

use crate::{Priority, QualityLadder, RuleName, RulesContext, SwitchRequest};

/// Tuning of the abandonment heuristic.
#[derive(Clone, Debug, Derivative, PartialEq)]
#[derivative(Default)]
pub struct AbandonOptions {
    /// Fraction of the segment duration that must elapse after the first byte
    /// before the download is judged.
    #[derivative(Default(value = "0.5"))]
    pub grace_time_threshold: f64,
    /// Abandon when the projected download time exceeds this many segment
    /// durations.
    #[derivative(Default(value = "2.0"))]
    pub abandon_multiplier: f64,
    /// Derating applied to the measured bandwidth before the ladder lookup.
    #[derivative(Default(value = "0.9"))]
    pub bandwidth_safety_factor: f64,
}

/// Watches the in-flight segment and asks for a lower quality when it will
/// not arrive in time.
///
/// The rule is advisory: aborting and re-fetching is up to the transport
/// layer once it receives a request that is not "no change".
#[derive(Clone, Debug)]
pub struct AbandonRequestsRule<L> {
    ladder: L,
    opts: AbandonOptions,
}

impl<L: QualityLadder> AbandonRequestsRule<L> {
    pub fn new(ladder: L) -> Self {
        Self::with_options(ladder, AbandonOptions::default())
    }

    pub fn with_options(ladder: L, opts: AbandonOptions) -> Self {
        Self { ladder, opts }
    }

    pub fn options(&self) -> &AbandonOptions {
        &self.opts
    }

    pub fn should_abandon(&self, ctx: &RulesContext<'_>, now: Instant) -> SwitchRequest {
        let no_change = SwitchRequest::no_change(RuleName::AbandonRequests);
        let media_type = ctx.media_type;

        let Some(request) = ctx.request else {
            return no_change;
        };
        let Some(first_byte_at) = request.first_byte_at.filter(|_| !request.aborted) else {
            tracing::trace!(media = %media_type, "request aborted or no first byte yet");
            return no_change;
        };
        if request.is_complete() {
            return no_change;
        }

        let elapsed_secs = now.saturating_duration_since(first_byte_at).as_secs_f64();
        let duration_secs = request.duration.as_secs_f64();
        if duration_secs <= 0.0
            || elapsed_secs <= 0.0
            || elapsed_secs < duration_secs * self.opts.grace_time_threshold
        {
            return no_change;
        }

        #[expect(clippy::cast_precision_loss)] // byte counts far below 2^52
        let (loaded, total) = (request.bytes_loaded as f64, request.bytes_total as f64);
        let bytes_per_sec = loaded / elapsed_secs;
        // Zero bytes after the grace period projects to infinity and abandons.
        let projected_secs = total / bytes_per_sec;

        tracing::trace!(
            media = %media_type,
            elapsed_secs,
            bytes_per_sec,
            projected_secs,
            duration_secs,
            "abandon check"
        );

        if projected_secs <= duration_secs * self.opts.abandon_multiplier {
            return no_change;
        }

        // kbps with three decimals: whole bits per second over 1000.
        let measured_kbps = (bytes_per_sec * 8.0).round() / 1000.0;
        let target_kbps = measured_kbps * self.opts.bandwidth_safety_factor;
        let quality = self.ladder.quality_for_bitrate(media_type, target_kbps);

        tracing::debug!(
            media = %media_type,
            measured_kbps,
            target_kbps,
            quality,
            "abandoning request"
        );
        SwitchRequest::to_quality(quality, Priority::Default, RuleName::AbandonRequests)
    }

    /// The rule keeps no state between downloads; kept for the common rule
    /// lifecycle.
    pub fn reset(&mut self) {
        tracing::trace!("abandon rule reset");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use unimock::{MockFn, Unimock, matching};

    use super::*;
    use crate::{Ladder, MediaType, SegmentRequest, ladder::QualityLadderMock};

    fn ladder() -> Ladder {
        Ladder::from_bandwidths([(MediaType::Video, vec![150_000, 300_000, 800_000, 2_000_000])])
            .unwrap()
    }

    fn in_flight(
        bytes_total: u64,
        bytes_loaded: u64,
        duration_secs: u64,
        elapsed: Duration,
    ) -> (SegmentRequest, Instant) {
        let first_byte_at = Instant::now();
        let request = SegmentRequest {
            bytes_loaded,
            first_byte_at: Some(first_byte_at),
            ..SegmentRequest::new(
                MediaType::Video,
                bytes_total,
                Duration::from_secs(duration_secs),
            )
        };
        (request, first_byte_at + elapsed)
    }

    #[rstest]
    #[case(Duration::ZERO)]
    #[case(Duration::from_millis(500))]
    #[case(Duration::from_millis(1999))]
    fn grace_period_suppresses_evaluation(#[case] elapsed: Duration) {
        // 1 byte loaded: would abandon immediately without the gate.
        let (request, now) = in_flight(1_000_000, 1, 4, elapsed);
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
    }

    #[test]
    fn slow_download_abandons_to_derated_bitrate() {
        // 100_000 B over 3 s → 33_333 B/s → 266.667 kbps → 240 kbps derated.
        let (request, now) = in_flight(1_000_000, 100_000, 4, Duration::from_secs(3));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        let decision = rule.should_abandon(&ctx, now);
        assert_eq!(decision.quality(), Some(0));
        assert_eq!(decision.priority(), Priority::Default);
        assert_eq!(decision.origin(), RuleName::AbandonRequests);
    }

    #[test]
    fn ladder_answer_is_forwarded() {
        let (request, now) = in_flight(1_000_000, 100_000, 4, Duration::from_secs(3));
        let ladder = Unimock::new(
            QualityLadderMock::quality_for_bitrate
                .some_call(matching!(MediaType::Video, _))
                .returns(1_usize),
        );
        let rule = AbandonRequestsRule::new(ladder);
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert_eq!(rule.should_abandon(&ctx, now).quality(), Some(1));
    }

    #[test]
    fn derated_bitrate_reaches_matching_rung() {
        // 266.667 kbps × 0.9 lands just above a 240 kbps rung.
        let ladder =
            Ladder::from_bandwidths([(MediaType::Video, vec![100_000, 240_000, 800_000])]).unwrap();
        let (request, now) = in_flight(1_000_000, 100_000, 4, Duration::from_secs(3));
        let rule = AbandonRequestsRule::new(ladder);
        let ctx = RulesContext::new(MediaType::Video, 2).with_request(&request);

        assert_eq!(rule.should_abandon(&ctx, now).quality(), Some(1));
    }

    #[test]
    fn fast_enough_download_is_kept() {
        // 600_000 B over 2 s → projected 3.33 s < 8 s.
        let (request, now) = in_flight(1_000_000, 600_000, 4, Duration::from_secs(2));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
    }

    #[test]
    fn projection_exactly_at_limit_is_kept() {
        // 250_000 B over 2 s → projected 8 s == 2 × 4 s.
        let (request, now) = in_flight(1_000_000, 250_000, 4, Duration::from_secs(2));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
    }

    #[test]
    fn nothing_received_after_grace_drops_to_lowest() {
        let (request, now) = in_flight(1_000_000, 0, 4, Duration::from_secs(3));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert_eq!(rule.should_abandon(&ctx, now).quality(), Some(0));
    }

    #[test]
    fn high_measured_bandwidth_keeps_higher_index() {
        // 500_000 B over 10 s of a 4 s segment: 400 kbps → 360 derated → index 1.
        let (request, now) = in_flight(4_000_000, 500_000, 4, Duration::from_secs(10));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert_eq!(rule.should_abandon(&ctx, now).quality(), Some(1));
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn aborted_or_unstarted_requests_are_ignored(#[case] aborted: bool, #[case] started: bool) {
        let (mut request, now) = in_flight(1_000_000, 1, 4, Duration::from_secs(3));
        request.aborted = aborted;
        if !started {
            request.first_byte_at = None;
        }
        // The ladder must not be consulted.
        let rule = AbandonRequestsRule::new(Unimock::new(()));
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
    }

    #[test]
    fn completed_download_needs_no_action() {
        let (request, now) = in_flight(1_000, 1_000, 4, Duration::from_secs(30));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
    }

    #[test]
    fn zero_duration_segment_is_not_judged() {
        let (request, now) = in_flight(1_000_000, 10, 0, Duration::from_secs(3));
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
    }

    #[test]
    fn missing_request_is_no_change() {
        let rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Audio, 0);
        assert!(rule.should_abandon(&ctx, Instant::now()).is_no_change());
    }

    #[test]
    fn repeated_evaluation_is_stable() {
        let (request, now) = in_flight(1_000_000, 100_000, 4, Duration::from_secs(3));
        let mut rule = AbandonRequestsRule::new(ladder());
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        let first = rule.should_abandon(&ctx, now);
        assert_eq!(rule.should_abandon(&ctx, now), first);

        rule.reset();
        let fresh = AbandonRequestsRule::new(ladder());
        assert_eq!(rule.should_abandon(&ctx, now), fresh.should_abandon(&ctx, now));
    }

    #[test]
    fn options_override_constants() {
        let opts = AbandonOptions {
            abandon_multiplier: 10.0,
            ..AbandonOptions::default()
        };
        // Projected 30 s < 10 × 4 s.
        let (request, now) = in_flight(1_000_000, 100_000, 4, Duration::from_secs(3));
        let rule = AbandonRequestsRule::with_options(ladder(), opts);
        let ctx = RulesContext::new(MediaType::Video, 3).with_request(&request);

        assert!(rule.should_abandon(&ctx, now).is_no_change());
        assert_eq!(rule.options().grace_time_threshold, 0.5);
    }
}
