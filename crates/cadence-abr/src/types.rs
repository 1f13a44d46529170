use std::fmt;

use serde::Deserialize;

/// Media type a rule is evaluated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
    Text,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Audio, MediaType::Video, MediaType::Text];

    const fn slot(self) -> usize {
        match self {
            Self::Audio => 0,
            Self::Video => 1,
            Self::Text => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size table with one optional slot per [`MediaType`].
#[derive(Clone, Debug, PartialEq)]
pub struct MediaTable<T> {
    slots: [Option<T>; 3],
}

impl<T> Default for MediaTable<T> {
    fn default() -> Self {
        Self {
            slots: [None, None, None],
        }
    }
}

impl<T> MediaTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, media_type: MediaType) -> Option<&T> {
        self.slots[media_type.slot()].as_ref()
    }

    pub fn get_mut(&mut self, media_type: MediaType) -> Option<&mut T> {
        self.slots[media_type.slot()].as_mut()
    }

    /// Returns the previous value, if any.
    pub fn insert(&mut self, media_type: MediaType, value: T) -> Option<T> {
        self.slots[media_type.slot()].replace(value)
    }

    pub fn get_or_insert_with(&mut self, media_type: MediaType, f: impl FnOnce() -> T) -> &mut T {
        self.slots[media_type.slot()].get_or_insert_with(f)
    }

    pub fn remove(&mut self, media_type: MediaType) -> Option<T> {
        self.slots[media_type.slot()].take()
    }

    pub fn clear(&mut self) {
        self.slots = [None, None, None];
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MediaType, &T)> {
        MediaType::ALL
            .into_iter()
            .filter_map(move |media_type| self.get(media_type).map(|value| (media_type, value)))
    }
}

/// Switch priority, read by the host's combiner as a weak/strong tie-break.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    #[default]
    Default,
    Strong,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Strong => f.write_str("strong"),
        }
    }
}

/// Rule that produced a [`SwitchRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleName {
    AbandonRequests,
    DroppedFrames,
    InsufficientBuffer,
}

impl RuleName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbandonRequests => "AbandonRequestsRule",
            Self::DroppedFrames => "DroppedFramesRule",
            Self::InsufficientBuffer => "InsufficientBufferRule",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision emitted by a rule.
///
/// `quality() == None` means "no change". A no-change request always carries
/// [`Priority::Default`]: the only way to build one is [`SwitchRequest::no_change`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchRequest {
    quality: Option<usize>,
    priority: Priority,
    origin: RuleName,
    dropped_frames: Option<u64>,
}

impl SwitchRequest {
    #[must_use]
    pub const fn no_change(origin: RuleName) -> Self {
        Self {
            quality: None,
            priority: Priority::Default,
            origin,
            dropped_frames: None,
        }
    }

    #[must_use]
    pub const fn to_quality(quality: usize, priority: Priority, origin: RuleName) -> Self {
        Self {
            quality: Some(quality),
            priority,
            origin,
            dropped_frames: None,
        }
    }

    /// Attach the dropped-frame count measured by the originating rule.
    #[must_use]
    pub const fn with_dropped_frames(mut self, dropped_frames: u64) -> Self {
        self.dropped_frames = Some(dropped_frames);
        self
    }

    pub const fn quality(&self) -> Option<usize> {
        self.quality
    }

    pub const fn priority(&self) -> Priority {
        self.priority
    }

    pub const fn origin(&self) -> RuleName {
        self.origin
    }

    pub const fn dropped_frames(&self) -> Option<u64> {
        self.dropped_frames
    }

    pub const fn is_no_change(&self) -> bool {
        self.quality.is_none()
    }
}
