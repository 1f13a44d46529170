use std::time::Duration;

use web_time::Instant;

use crate::MediaType;

/// Download telemetry for the segment currently being fetched.
///
/// Owned and mutated by the transport layer; rules only read snapshots of it.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentRequest {
    pub media_type: MediaType,
    /// Size of the requested byte range.
    pub bytes_total: u64,
    /// Bytes received so far.
    pub bytes_loaded: u64,
    /// Nominal playback duration of the segment.
    pub duration: Duration,
    /// When the first byte of the response arrived, if it has.
    pub first_byte_at: Option<Instant>,
    pub aborted: bool,
}

impl SegmentRequest {
    #[must_use]
    pub fn new(media_type: MediaType, bytes_total: u64, duration: Duration) -> Self {
        Self {
            media_type,
            bytes_total,
            bytes_loaded: 0,
            duration,
            first_byte_at: None,
            aborted: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_loaded >= self.bytes_total
    }
}

/// One per-interval sample of the renderer's frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSample {
    pub dropped_frames: Option<u64>,
    pub total_frames: Option<u64>,
}

impl FrameSample {
    #[must_use]
    pub const fn new(dropped_frames: u64, total_frames: u64) -> Self {
        Self {
            dropped_frames: Some(dropped_frames),
            total_frames: Some(total_frames),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferState {
    Buffering,
    Loaded,
}

/// One buffer controller metric: fill level in seconds plus state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferSample {
    pub level_secs: f64,
    pub state: BufferState,
}

impl BufferSample {
    #[must_use]
    pub const fn new(level_secs: f64, state: BufferState) -> Self {
        Self { level_secs, state }
    }
}

/// Snapshot of everything a rule may read for one evaluation.
///
/// Metric slices are ordered oldest first.
#[derive(Clone, Copy, Debug)]
pub struct RulesContext<'a> {
    pub media_type: MediaType,
    /// Quality index currently selected for `media_type`.
    pub current_quality: usize,
    /// Minimum buffer time declared by the manifest.
    pub manifest_min_buffer_time: Duration,
    pub request: Option<&'a SegmentRequest>,
    pub frame_history: &'a [FrameSample],
    pub buffer_samples: &'a [BufferSample],
}

impl<'a> RulesContext<'a> {
    #[must_use]
    pub const fn new(media_type: MediaType, current_quality: usize) -> Self {
        Self {
            media_type,
            current_quality,
            manifest_min_buffer_time: Duration::ZERO,
            request: None,
            frame_history: &[],
            buffer_samples: &[],
        }
    }

    #[must_use]
    pub const fn with_manifest_min_buffer_time(mut self, min_buffer_time: Duration) -> Self {
        self.manifest_min_buffer_time = min_buffer_time;
        self
    }

    #[must_use]
    pub const fn with_request(mut self, request: &'a SegmentRequest) -> Self {
        self.request = Some(request);
        self
    }

    #[must_use]
    pub const fn with_frame_history(mut self, frame_history: &'a [FrameSample]) -> Self {
        self.frame_history = frame_history;
        self
    }

    #[must_use]
    pub const fn with_buffer_samples(mut self, buffer_samples: &'a [BufferSample]) -> Self {
        self.buffer_samples = buffer_samples;
        self
    }

    pub fn last_buffer_sample(&self) -> Option<&'a BufferSample> {
        self.buffer_samples.last()
    }

    /// Current buffer level in seconds; `0.0` before any sample exists.
    pub fn buffer_level_secs(&self) -> f64 {
        self.last_buffer_sample().map_or(0.0, |sample| sample.level_secs)
    }
}
